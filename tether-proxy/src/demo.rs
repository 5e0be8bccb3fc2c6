//! Demo backend: a tiny HTTP server that names itself in every response.

use std::convert::Infallible;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::error::ProxyError;

/// Serve HTTP/1.1 on `listener` until the task is dropped.
pub async fn serve(listener: TcpListener) -> Result<(), ProxyError> {
    let port = listener.local_addr()?.port();
    info!(port, "backend listening");

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        tokio::task::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .serve_connection(io, service_fn(move |req| handle_request(port, req)))
                .await
            {
                debug!(%err, "error serving connection");
            }
        });
    }
}

/// The response body a demo backend on `port` sends for `path`.
pub fn greeting(port: u16, path: &str) -> String {
    format!("Hello from backend :{port} (path={path})\n")
}

async fn handle_request(
    port: u16,
    req: Request<hyper::body::Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    debug!(method = %req.method(), uri = %req.uri(), "received request");
    let body = greeting(port, req.uri().path());
    Ok(Response::new(Full::new(Bytes::from(body))))
}
