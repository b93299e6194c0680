//! Shared helpers for router-level integration tests.
//!
//! Builds an isolated [`AppContext`] per test and hand-assembles
//! `multipart/form-data` bodies so requests can be driven through
//! `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use std::io::Cursor;

use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageforged::config::Config;
use imageforged::server::{create_router, AppContext};

pub const BOUNDARY: &str = "imageforged-test-boundary";

/// Fresh context with default configuration.
pub fn test_context() -> AppContext {
    AppContext::new(Config::default())
}

pub fn test_router(ctx: &AppContext) -> Router {
    create_router(ctx.clone(), None)
}

/// Encode a small solid-colour image in `format`.
pub fn image_bytes(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([200, 40, 90, 255]));
    let img = if format == ImageFormat::Jpeg {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(img).to_rgb8())
    } else {
        DynamicImage::ImageRgba8(img)
    };
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    image_bytes(width, height, ImageFormat::Png)
}

/// One part of a multipart request body.
pub enum Part<'a> {
    File {
        field: &'a str,
        filename: &'a str,
        content_type: &'a str,
        data: Vec<u8>,
    },
    Text {
        field: &'a str,
        value: &'a str,
    },
}

/// Shorthand for a `files` part.
pub fn file<'a>(filename: &'a str, content_type: &'a str, data: Vec<u8>) -> Part<'a> {
    Part::File {
        field: "files",
        filename,
        content_type,
        data,
    }
}

pub fn format_field(value: &str) -> Part<'_> {
    Part::Text {
        field: "format",
        value,
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File {
                field,
                filename,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{field}\"; \
                         filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
            Part::Text { field, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}")
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// `POST /convert` request, optionally carrying a session cookie.
pub fn convert_request(parts: &[Part<'_>], cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/convert")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(multipart_body(parts))).unwrap()
}

pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// `name=value` pair of the session cookie set by a response.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("imageforged_session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub async fn body_to_bytes(body: Body) -> Vec<u8> {
    body.collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_to_json(body: Body) -> serde_json::Value {
    let bytes = body_to_bytes(body).await;
    serde_json::from_slice(&bytes).unwrap()
}
