// 错误分类模块 - 将 reqwest 底层错误归类为传输错误类型
use reqwest::Error;

use crate::core::error::{TransportError, TransportErrorKind};

pub fn classify_kind(error: &Error) -> TransportErrorKind {
    if error.is_timeout() {
        TransportErrorKind::Timeout
    } else if error.is_connect() {
        TransportErrorKind::Connect
    } else if error.is_decode() {
        TransportErrorKind::Decode
    } else if error.is_body() {
        TransportErrorKind::Body
    } else if error.is_request() || error.is_builder() {
        TransportErrorKind::Request
    } else {
        TransportErrorKind::Unknown
    }
}

pub fn classify_transport_error(error: Error) -> TransportError {
    TransportError::new(classify_kind(&error), error.to_string())
}
