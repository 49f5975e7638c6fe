use std::io::Write;
use std::net::TcpListener;
use std::time::{Duration, Instant};

use gelfprims_chunk::{ChunkError, ChunkWriter};
use gelfprims_transport::{Endpoint, GelfConn};

#[test]
fn write_timeout_ends_send_to_peer_that_never_reads() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("listener should bind");
    let port = listener.local_addr().expect("local addr").port();

    let endpoint = Endpoint::parse(&format!("tcp://127.0.0.1:{port}")).expect("uri should parse");
    let conn = GelfConn::dial(&endpoint).expect("tcp dial should succeed");
    // Held open and never read.
    let (_peer, _) = listener.accept().expect("peer should accept");

    conn.set_write_timeout(Some(Duration::from_millis(100)))
        .expect("write timeout should apply");
    let mut writer = ChunkWriter::for_conn(conn, 1420).expect("writer should build");

    let payload = vec![b'x'; 150_000];
    let started = Instant::now();
    let err = loop {
        assert!(
            started.elapsed() < Duration::from_secs(30),
            "flush_message kept blocking past its write timeout"
        );
        writer.write_all(&payload).expect("payload fits one message");
        if let Err(err) = writer.flush_message() {
            break err;
        }
    };

    assert!(matches!(err, ChunkError::WriteTimedOut { len: 1420, .. }));
    assert_eq!(writer.buffered(), 0);
}
