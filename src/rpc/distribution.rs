//! The Erlang distribution protocol, as far as it is needed for a single rpc call.
//!
//! Handshake messages are framed with a 2 byte length, messages after the handshake with a 4 byte length.
//! A message of length 0 is a tick. riak_stats does not negotiate the atom cache,
//! so every message arrives as a pass through message: `p`, the control term, and the message term.
//!
use std::{fmt, io::{self, Cursor}, str::FromStr};
use tokio::{io::{AsyncReadExt, AsyncWriteExt}, net::TcpStream};
use eetf::{Atom, FixInteger, List, Pid, Term, Tuple};
use log::*;
use crate::rpc::{DistConnection, EpmdEntry, NodeName};

const EPMD_PORT_PLEASE2_REQ: u8 = 122;
const EPMD_PORT2_RESP: u8 = 119;

const DFLAG_EXTENDED_REFERENCES: u64 = 0x4;
const DFLAG_DIST_MONITOR: u64 = 0x8;
const DFLAG_FUN_TAGS: u64 = 0x10;
const DFLAG_NEW_FUN_TAGS: u64 = 0x80;
const DFLAG_EXTENDED_PIDS_PORTS: u64 = 0x100;
const DFLAG_EXPORT_PTR_TAG: u64 = 0x200;
const DFLAG_BIT_BINARIES: u64 = 0x400;
const DFLAG_NEW_FLOATS: u64 = 0x800;
const DFLAG_UTF8_ATOMS: u64 = 0x10000;
const DFLAG_MAP_TAG: u64 = 0x20000;
const DFLAG_BIG_CREATION: u64 = 0x40000;
const DFLAG_HANDSHAKE_23: u64 = 0x100_0000;
const DFLAG_UNLINK_ID: u64 = 0x200_0000;
const DFLAG_V4_NC: u64 = 1 << 34;

/// The capabilities announced in the handshake.
pub const DIST_FLAGS: u64 = DFLAG_EXTENDED_REFERENCES
    | DFLAG_DIST_MONITOR
    | DFLAG_FUN_TAGS
    | DFLAG_NEW_FUN_TAGS
    | DFLAG_EXTENDED_PIDS_PORTS
    | DFLAG_EXPORT_PTR_TAG
    | DFLAG_BIT_BINARIES
    | DFLAG_NEW_FLOATS
    | DFLAG_UTF8_ATOMS
    | DFLAG_MAP_TAG
    | DFLAG_BIG_CREATION
    | DFLAG_HANDSHAKE_23
    | DFLAG_UNLINK_ID
    | DFLAG_V4_NC;

const PASS_THROUGH: u8 = b'p';
const SEND: i32 = 2;
const REG_SEND: i32 = 6;
const SEND_SENDER: i32 = 22;

impl FromStr for NodeName {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.split_once('@') {
            Some((alive, host)) if !alive.is_empty() && alive.len() <= 255 && !host.is_empty() && !host.contains('@') => {
                Ok(NodeName { alive: alive.to_string(), host: host.to_string() })
            },
            _ => Err(format!("invalid node name: {}", name)),
        }
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.alive, self.host)
    }
}

/// The flags for the version 5 name message, which only has room for the lower 32 bits.
///
/// Without `DFLAG_HANDSHAKE_23` the node answers with an old style challenge.
pub fn dist_flags_v5() -> u32 {
    ((DIST_FLAGS & !DFLAG_HANDSHAKE_23) & 0xffff_ffff) as u32
}

/// The challenge digest: md5 over the cookie followed by the challenge in decimal.
pub fn digest(
    cookie: &str,
    challenge: u32,
) -> [u8; 16]
{
    md5::compute(format!("{}{}", cookie, challenge)).0
}

fn protocol_error(message: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.into())
}

fn be_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Ask epmd on `host` for the registration of the node `alive`.
/// Returns `None` when the node is not registered.
pub async fn epmd_port_please(
    host: &str,
    epmd_port: u16,
    alive: &str,
) -> io::Result<Option<EpmdEntry>>
{
    let mut stream = TcpStream::connect((host, epmd_port)).await?;
    let mut request = Vec::with_capacity(alive.len() + 3);
    request.extend_from_slice(&(alive.len() as u16 + 1).to_be_bytes());
    request.push(EPMD_PORT_PLEASE2_REQ);
    request.extend_from_slice(alive.as_bytes());
    stream.write_all(&request).await?;

    let tag = stream.read_u8().await?;
    if tag != EPMD_PORT2_RESP {
        return Err(protocol_error(format!("unexpected epmd response: {}", tag)));
    }
    if stream.read_u8().await? != 0 {
        return Ok(None);
    }
    let port = stream.read_u16().await?;
    let _node_type = stream.read_u8().await?;
    let _protocol = stream.read_u8().await?;
    let highest_version = stream.read_u16().await?;
    let lowest_version = stream.read_u16().await?;
    Ok(Some(EpmdEntry { port, highest_version, lowest_version }))
}

async fn write_handshake_frame(
    stream: &mut TcpStream,
    payload: &[u8],
) -> io::Result<()>
{
    let mut frame = Vec::with_capacity(payload.len() + 2);
    frame.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    frame.extend_from_slice(payload);
    stream.write_all(&frame).await
}

async fn read_handshake_frame(
    stream: &mut TcpStream,
) -> io::Result<Vec<u8>>
{
    let length = stream.read_u16().await?;
    let mut frame = vec![0; length as usize];
    stream.read_exact(&mut frame).await?;
    Ok(frame)
}

/// The client side of the handshake: name, status, challenge, challenge reply, challenge ack.
async fn handshake(
    stream: &mut TcpStream,
    local_node: &str,
    cookie: &str,
    version6: bool,
    creation: u32,
) -> io::Result<()>
{
    let mut name = Vec::with_capacity(local_node.len() + 15);
    if version6 {
        name.push(b'N');
        name.extend_from_slice(&DIST_FLAGS.to_be_bytes());
        name.extend_from_slice(&creation.to_be_bytes());
        name.extend_from_slice(&(local_node.len() as u16).to_be_bytes());
    } else {
        name.push(b'n');
        name.extend_from_slice(&5_u16.to_be_bytes());
        name.extend_from_slice(&dist_flags_v5().to_be_bytes());
    }
    name.extend_from_slice(local_node.as_bytes());
    write_handshake_frame(stream, &name).await?;

    let status = read_handshake_frame(stream).await?;
    if status.first() != Some(&b's') {
        return Err(protocol_error("unexpected handshake status message"));
    }
    match String::from_utf8_lossy(&status[1..]).as_ref() {
        "ok" | "ok_simultaneous" => {},
        refused => return Err(protocol_error(format!("handshake refused: {}", refused))),
    }

    let challenge = read_handshake_frame(stream).await?;
    let peer_challenge = match challenge.first() {
        Some(&b'n') if challenge.len() >= 11 => be_u32(&challenge[7..11]),
        Some(&b'N') if challenge.len() >= 19 => be_u32(&challenge[9..13]),
        _ => return Err(protocol_error("unexpected handshake challenge message")),
    };

    let own_challenge: u32 = rand::random();
    let mut reply = Vec::with_capacity(21);
    reply.push(b'r');
    reply.extend_from_slice(&own_challenge.to_be_bytes());
    reply.extend_from_slice(&digest(cookie, peer_challenge));
    write_handshake_frame(stream, &reply).await?;

    let ack = read_handshake_frame(stream).await?;
    if ack.len() != 17 || ack[0] != b'a' {
        return Err(protocol_error("unexpected handshake challenge ack message"));
    }
    if ack[1..] != digest(cookie, own_challenge) {
        return Err(protocol_error("challenge ack digest mismatch, the node has a different cookie"));
    }
    Ok(())
}

fn is_send(control: &Term) -> bool {
    match control {
        Term::Tuple(tuple) => matches!(tuple.elements.first(), Some(Term::FixInteger(op)) if [SEND, REG_SEND, SEND_SENDER].contains(&op.value)),
        _ => false,
    }
}

/// The reply in a `{rex, Reply}` message.
fn rex_reply(message: Term) -> Option<Term> {
    match message {
        Term::Tuple(mut tuple)
            if tuple.elements.len() == 2
                && matches!(&tuple.elements[0], Term::Atom(atom) if atom.name == "rex") => Some(tuple.elements.remove(1)),
        _ => None,
    }
}

impl DistConnection {
    /// Look up the node in epmd, connect to it, and authenticate with the cookie.
    pub async fn connect(
        local: &NodeName,
        remote: &NodeName,
        cookie: &str,
        epmd_port: u16,
    ) -> io::Result<DistConnection>
    {
        let entry = epmd_port_please(&remote.host, epmd_port, &remote.alive).await?
            .ok_or_else(|| protocol_error(format!("node {} is not registered in epmd", remote)))?;
        debug!("epmd: {} on port {}, versions {}-{}", remote, entry.port, entry.lowest_version, entry.highest_version);
        if entry.highest_version < 5 || entry.lowest_version > 6 {
            return Err(protocol_error(format!("unsupported distribution versions {}-{}", entry.lowest_version, entry.highest_version)));
        }
        let version6 = entry.highest_version >= 6;
        // old nodes only know creation 1 to 3.
        let creation: u32 = if version6 { rand::random::<u32>().max(4) } else { rand::random::<u32>() % 3 + 1 };

        let mut stream = TcpStream::connect((remote.host.as_str(), entry.port)).await?;
        stream.set_nodelay(true)?;
        handshake(&mut stream, &local.to_string(), cookie, version6, creation).await?;
        debug!("handshake with {} done", remote);

        Ok(DistConnection {
            stream,
            local_pid: Pid::new(local.to_string(), 1, 0, creation),
        })
    }
    /// Call `module:function(arguments...)` via the `rex` server of the node, and return the reply.
    pub async fn rpc(
        &mut self,
        module: &str,
        function: &str,
        arguments: List,
    ) -> io::Result<Term>
    {
        let control = Term::Tuple(Tuple::from(vec![
            Term::FixInteger(FixInteger::from(REG_SEND)),
            Term::Pid(self.local_pid.clone()),
            Term::Atom(Atom::from("")),
            Term::Atom(Atom::from("rex")),
        ]));
        let message = Term::Tuple(Tuple::from(vec![
            Term::Pid(self.local_pid.clone()),
            Term::Tuple(Tuple::from(vec![
                Term::Atom(Atom::from("call")),
                Term::Atom(Atom::from(module)),
                Term::Atom(Atom::from(function)),
                Term::List(arguments),
                Term::Atom(Atom::from("user")),
            ])),
        ]));
        self.send(&control, &message).await?;

        loop {
            let (control, message) = match self.receive().await? {
                Some(received) => received,
                None => continue,
            };
            if !is_send(&control) {
                debug!("skipping control message: {}", control);
                continue;
            }
            match message.and_then(rex_reply) {
                Some(reply) => return Ok(reply),
                None => debug!("skipping message that is not a rex reply"),
            }
        }
    }
    async fn send(
        &mut self,
        control: &Term,
        message: &Term,
    ) -> io::Result<()>
    {
        let mut payload = vec![PASS_THROUGH];
        control.encode(&mut payload).map_err(|e| protocol_error(e.to_string()))?;
        message.encode(&mut payload).map_err(|e| protocol_error(e.to_string()))?;
        let mut frame = Vec::with_capacity(payload.len() + 4);
        frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        frame.extend_from_slice(&payload);
        self.stream.write_all(&frame).await?;
        self.stream.flush().await
    }
    /// Read one message. Ticks give `None`, control messages without a message term give no message.
    async fn receive(
        &mut self,
    ) -> io::Result<Option<(Term, Option<Term>)>>
    {
        let length = self.stream.read_u32().await?;
        if length == 0 {
            debug!("tick");
            return Ok(None);
        }
        let mut frame = vec![0; length as usize];
        self.stream.read_exact(&mut frame).await?;
        if frame[0] != PASS_THROUGH {
            return Err(protocol_error(format!("unsupported distribution header: {}", frame[0])));
        }
        let terms = &frame[1..];
        let mut cursor = Cursor::new(terms);
        let control = Term::decode(&mut cursor).map_err(|e| protocol_error(e.to_string()))?;
        let message = if (cursor.position() as usize) < terms.len() {
            Some(Term::decode(&mut cursor).map_err(|e| protocol_error(e.to_string()))?)
        } else {
            None
        };
        Ok(Some((control, message)))
    }
    pub async fn close(
        mut self,
    )
    {
        if let Err(e) = self.stream.shutdown().await {
            debug!("error closing connection: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_parse_node_name() {
        let node: NodeName = "riak@127.0.0.1".parse().unwrap();
        assert_eq!(node.alive, "riak");
        assert_eq!(node.host, "127.0.0.1");
        assert_eq!(node.to_string(), "riak@127.0.0.1");
    }

    #[test]
    fn unit_parse_invalid_node_names() {
        assert!("riak".parse::<NodeName>().is_err());
        assert!("@127.0.0.1".parse::<NodeName>().is_err());
        assert!("riak@".parse::<NodeName>().is_err());
        assert!("riak@a@b".parse::<NodeName>().is_err());
        assert!("".parse::<NodeName>().is_err());
    }

    #[test]
    fn unit_digest() {
        assert_eq!(digest("riak", 42), [200, 149, 171, 113, 67, 222, 52, 234, 248, 136, 136, 225, 170, 187, 55, 9]);
        assert_ne!(digest("riak", 42), digest("other", 42));
    }

    #[test]
    fn unit_flags() {
        assert_ne!(DIST_FLAGS & DFLAG_HANDSHAKE_23, 0);
        assert_eq!(u64::from(dist_flags_v5()) & DFLAG_HANDSHAKE_23, 0);
        assert_ne!(u64::from(dist_flags_v5()) & DFLAG_UTF8_ATOMS, 0);
    }

    #[test]
    fn unit_rex_reply() {
        let message = Term::Tuple(Tuple::from(vec![Term::Atom(Atom::from("rex")), Term::Atom(Atom::from("pong"))]));
        assert_eq!(rex_reply(message), Some(Term::Atom(Atom::from("pong"))));
        let message = Term::Tuple(Tuple::from(vec![Term::Atom(Atom::from("other")), Term::Atom(Atom::from("pong"))]));
        assert_eq!(rex_reply(message), None);
        assert_eq!(rex_reply(Term::Atom(Atom::from("rex"))), None);
    }

    #[test]
    fn unit_is_send() {
        let send = Term::Tuple(Tuple::from(vec![Term::FixInteger(FixInteger::from(SEND)), Term::Atom(Atom::from(""))]));
        assert!(is_send(&send));
        let link = Term::Tuple(Tuple::from(vec![Term::FixInteger(FixInteger::from(1))]));
        assert!(!is_send(&link));
        assert!(!is_send(&Term::Atom(Atom::from("send"))));
    }

    #[tokio::test]
    async fn unit_epmd_not_running() {
        // bind and release a port, so nothing listens on it.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        assert!(epmd_port_please("127.0.0.1", port, "riak").await.is_err());
    }
}
