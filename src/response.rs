use crate::command::CommandObject;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http::{
    header::{CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, USER_AGENT},
    HeaderMap, HeaderValue, StatusCode,
};

pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";

/// A fully serialized command, ready to be written once to the transport.
#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CommandResponse {
    pub fn new(command: &CommandObject, banner: &HeaderValue) -> serde_json::Result<Self> {
        let body = Bytes::from(command.to_json()?);
        let mut headers = HeaderMap::with_capacity(4);
        headers.insert(USER_AGENT, banner.clone());
        headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
        headers.insert(CONNECTION, HeaderValue::from_static("close"));
        Ok(Self {
            status: StatusCode::OK,
            headers,
            body,
        })
    }
}

impl IntoResponse for CommandResponse {
    fn into_response(self) -> Response {
        (self.status, self.headers, self.body).into_response()
    }
}

/// Header value for the response banner, falling back to the crate's own
/// user agent when `name` is not a valid header value.
pub fn banner_header(name: Option<&str>) -> HeaderValue {
    name.and_then(|name| HeaderValue::from_str(name).ok())
        .or_else(|| HeaderValue::from_str(&crate::version::get_useragent()).ok())
        .unwrap_or_else(|| HeaderValue::from_static("rtserver"))
}
