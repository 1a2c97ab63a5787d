//! Conversions between hyper types and normalized values, so any hyper-based
//! listener can drive a [`MockEndpoint`](crate::MockEndpoint).

use crate::error::AdapterError;
use crate::request::{parse_query_string, Method, Multimap, NormalizedRequest, NormalizedResponse};
use bytes::Bytes;
use http_body_util::Full;
use hyper::http::request::Parts;
use hyper::Response;

impl NormalizedRequest {
    /// Normalize a request whose body has already been collected.
    pub fn from_hyper(parts: &Parts, body: Bytes) -> Result<Self, AdapterError> {
        let method: Method = parts
            .method
            .as_str()
            .parse()
            .map_err(AdapterError::UnsupportedMethod)?;

        let mut headers = Multimap::new();
        for (name, value) in &parts.headers {
            headers
                .entry(name.as_str().to_string())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }

        Ok(NormalizedRequest {
            method,
            path: parts.uri.path().to_string(),
            headers,
            query_parameters: parts.uri.query().map(parse_query_string).unwrap_or_default(),
            body,
        })
    }
}

impl NormalizedResponse {
    pub fn into_hyper(self) -> Result<Response<Full<Bytes>>, AdapterError> {
        let mut builder = Response::builder().status(self.status_code);
        for (name, values) in &self.headers {
            for value in values {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        Ok(builder.body(Full::new(self.body))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use hyper::Request;

    fn parts(request: Request<()>) -> Parts {
        request.into_parts().0
    }

    #[test]
    fn test_from_hyper() {
        let parts = parts(
            Request::builder()
                .method("POST")
                .uri("http://localhost/orders?id=1&id=2&q=a%20b")
                .header("Content-Type", "application/json")
                .header("X-Trace", "t1")
                .header("X-Trace", "t2")
                .body(())
                .unwrap(),
        );
        let request = NormalizedRequest::from_hyper(&parts, Bytes::from_static(b"{}")).unwrap();

        assert_eq!(request.method, Method::Post);
        assert_eq!(request.path, "/orders");
        assert_eq!(request.headers["content-type"], vec!["application/json"]);
        assert_eq!(request.headers["x-trace"], vec!["t1", "t2"]);
        assert_eq!(request.query_parameters["id"], vec!["1", "2"]);
        assert_eq!(request.query_parameters["q"], vec!["a b"]);
        assert_eq!(request.body_text(), "{}");
    }

    #[test]
    fn test_from_hyper_without_query() {
        let parts = parts(Request::builder().uri("/health").body(()).unwrap());
        let request = NormalizedRequest::from_hyper(&parts, Bytes::new()).unwrap();
        assert_eq!(request.method, Method::Get);
        assert!(request.query_parameters.is_empty());
    }

    #[test]
    fn test_extension_method_rejected() {
        let parts = parts(Request::builder().method("PURGE").uri("/").body(()).unwrap());
        let err = NormalizedRequest::from_hyper(&parts, Bytes::new()).unwrap_err();
        assert!(matches!(err, AdapterError::UnsupportedMethod(ref m) if m == "PURGE"));
    }

    #[tokio::test]
    async fn test_into_hyper() {
        let mut headers = Multimap::new();
        headers.insert("Set-Cookie".to_string(), vec!["a=1".to_string(), "b=2".to_string()]);
        let response = NormalizedResponse {
            status_code: 201,
            headers,
            body: Bytes::from_static(b"created"),
        }
        .into_hyper()
        .unwrap();

        assert_eq!(response.status(), 201);
        assert_eq!(response.headers().get_all("set-cookie").iter().count(), 2);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"created");
    }

    #[test]
    fn test_invalid_status_is_error() {
        let response = NormalizedResponse {
            status_code: 42,
            headers: Multimap::new(),
            body: Bytes::new(),
        };
        assert!(matches!(response.into_hyper(), Err(AdapterError::Response(_))));
    }
}
