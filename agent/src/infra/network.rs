//! Host port availability via a real bind attempt.

use std::net::{Ipv4Addr, TcpListener};

use crate::application::ports::PortProbe;

/// Probes by binding `127.0.0.1:<port>` and dropping the listener at once.
pub struct TcpPortProbe;

impl PortProbe for TcpPortProbe {
    fn is_bindable(&self, port: u16) -> bool {
        TcpListener::bind((Ipv4Addr::LOCALHOST, port)).is_ok()
    }
}
