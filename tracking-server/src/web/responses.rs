//! Fixed client-visible responses.
//!
//! Every route answers with a constant artifact; nothing about a response
//! body depends on the event bus or on request internals beyond the
//! redirect target carried inside a verified token.

use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};

/// Transparent 1x1 GIF served on every open hit, 43 bytes.
pub static TRACKING_PIXEL: [u8; 43] = [
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, // GIF89a
    0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, // 1x1, global color table
    0x00, 0x00, 0x00, 0xff, 0xff, 0xff, // two palette entries
    0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, // transparency extension
    0x2c, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, // image descriptor
    0x02, 0x02, 0x44, 0x01, 0x00, // image data
    0x3b, // trailer
];

/// Confirmation page rendered after a successful unsubscribe hit.
pub const UNSUBSCRIBE_CONFIRMATION: &str = "<!DOCTYPE html>\n\
<html>\n\
<head><title>Unsubscribed</title></head>\n\
<body>\n\
<h1>You have been unsubscribed</h1>\n\
<p>You will no longer receive emails from this sender.</p>\n\
</body>\n\
</html>\n";

/// Generic body for rejected click and unsubscribe links. Deliberately
/// carries no detail about why the link was rejected.
pub const BAD_LINK_BODY: &str = "Invalid tracking link";

/// The pixel response: 200, GIF bytes, caching disabled.
///
/// Mail clients cache images aggressively; without these headers a single
/// fetch would swallow every subsequent open of the same email.
pub fn pixel_response() -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/gif"),
            (header::CACHE_CONTROL, "no-store, no-cache, must-revalidate"),
            (header::PRAGMA, "no-cache"),
            (header::EXPIRES, "0"),
        ],
        TRACKING_PIXEL.as_slice(),
    )
        .into_response()
}

/// Temporary redirect to the link carried inside a verified click token.
pub fn redirect_response(link_url: &str) -> Response {
    (
        StatusCode::TEMPORARY_REDIRECT,
        [(header::LOCATION, link_url)],
    )
        .into_response()
}

/// Confirmation page for a successful unsubscribe.
pub fn unsubscribe_response() -> Response {
    Html(UNSUBSCRIBE_CONFIRMATION).into_response()
}

/// Generic 400 for rejected links.
pub fn bad_link_response() -> Response {
    (StatusCode::BAD_REQUEST, BAD_LINK_BODY).into_response()
}
