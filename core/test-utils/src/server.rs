use std::net::{SocketAddr, TcpListener};

use axum::Router;

/// Serve the router on an ephemeral localhost port in the background and return the bound address.
pub async fn spawn_router(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind test listener");
    listener
        .set_nonblocking(true)
        .expect("Failed to set listener to non-blocking");
    let addr = listener.local_addr().expect("Listener has no local address");

    let server = axum::Server::from_tcp(listener)
        .expect("Failed to create server from listener")
        .serve(router.into_make_service());

    tokio::spawn(async move {
        if let Err(e) = server.await {
            eprintln!("mock server on {addr} stopped: {e}");
        }
    });

    addr
}

/// An address nothing is listening on.
pub fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind test listener");
    listener.local_addr().expect("Listener has no local address")
}
