//! SOCKS5 client handshake (RFC 1928) with username/password
//! sub-negotiation (RFC 1929).

use crate::error::Error;
use std::net::IpAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const VERSION: u8 = 0x05;
const METHOD_NONE: u8 = 0x00;
const METHOD_USERPASS: u8 = 0x02;
const METHOD_UNACCEPTABLE: u8 = 0xff;
const CMD_CONNECT: u8 = 0x01;
const ATYP_IPV4: u8 = 0x01;
const ATYP_DOMAIN: u8 = 0x03;
const ATYP_IPV6: u8 = 0x04;

/// Negotiate a CONNECT tunnel to `host:port` over an established stream to
/// the SOCKS5 endpoint. On success the stream carries the tunnel.
pub(crate) async fn handshake(
    stream: &mut TcpStream,
    auth: Option<&(String, String)>,
    host: &str,
    port: u16,
) -> Result<(), Error> {
    greet(stream, auth).await?;
    connect(stream, host, port).await
}

async fn greet(
    stream: &mut TcpStream,
    auth: Option<&(String, String)>,
) -> Result<(), Error> {
    let greeting: &[u8] = match auth {
        Some(_) => &[VERSION, 2, METHOD_NONE, METHOD_USERPASS],
        None => &[VERSION, 1, METHOD_NONE],
    };
    stream.write_all(greeting).await.map_err(Error::transport)?;

    let mut choice = [0u8; 2];
    stream.read_exact(&mut choice).await.map_err(Error::transport)?;
    if choice[0] != VERSION {
        return Err(Error::transport(format!(
            "SOCKS5 endpoint answered with version {:#04x}",
            choice[0]
        )));
    }

    match (choice[1], auth) {
        (METHOD_NONE, _) => Ok(()),
        (METHOD_USERPASS, Some((user, pass))) => authenticate(stream, user, pass).await,
        (METHOD_UNACCEPTABLE, _) => {
            Err(Error::transport("SOCKS5 endpoint rejected offered auth methods"))
        }
        (method, _) => {
            Err(Error::transport(format!("SOCKS5 endpoint chose unsupported method {method:#04x}")))
        }
    }
}

async fn authenticate(stream: &mut TcpStream, user: &str, pass: &str) -> Result<(), Error> {
    // Lengths are validated to fit u8 when the strategy is configured.
    let mut req = Vec::with_capacity(3 + user.len() + pass.len());
    req.push(0x01);
    req.push(user.len() as u8);
    req.extend_from_slice(user.as_bytes());
    req.push(pass.len() as u8);
    req.extend_from_slice(pass.as_bytes());
    stream.write_all(&req).await.map_err(Error::transport)?;

    let mut status = [0u8; 2];
    stream.read_exact(&mut status).await.map_err(Error::transport)?;
    if status[1] != 0x00 {
        return Err(Error::transport("SOCKS5 username/password authentication failed"));
    }
    Ok(())
}

async fn connect(stream: &mut TcpStream, host: &str, port: u16) -> Result<(), Error> {
    let mut req = vec![VERSION, CMD_CONNECT, 0x00];
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => {
            req.push(ATYP_IPV4);
            req.extend_from_slice(&ip.octets());
        }
        Ok(IpAddr::V6(ip)) => {
            req.push(ATYP_IPV6);
            req.extend_from_slice(&ip.octets());
        }
        Err(_) => {
            if host.len() > 255 {
                return Err(Error::transport("SOCKS5 target hostname exceeds 255 bytes"));
            }
            req.push(ATYP_DOMAIN);
            req.push(host.len() as u8);
            req.extend_from_slice(host.as_bytes());
        }
    }
    req.extend_from_slice(&port.to_be_bytes());
    stream.write_all(&req).await.map_err(Error::transport)?;

    let mut reply = [0u8; 4];
    stream.read_exact(&mut reply).await.map_err(Error::transport)?;
    if reply[1] != 0x00 {
        return Err(Error::transport(format!("SOCKS5 connect rejected with code {}", reply[1])));
    }

    // Drain the bound address so the stream starts at the tunnel payload.
    match reply[3] {
        ATYP_IPV4 => {
            let mut bound = [0u8; 6];
            stream.read_exact(&mut bound).await.map_err(Error::transport)?;
        }
        ATYP_IPV6 => {
            let mut bound = [0u8; 18];
            stream.read_exact(&mut bound).await.map_err(Error::transport)?;
        }
        ATYP_DOMAIN => {
            let mut len = [0u8; 1];
            stream.read_exact(&mut len).await.map_err(Error::transport)?;
            let mut bound = vec![0u8; len[0] as usize + 2];
            stream.read_exact(&mut bound).await.map_err(Error::transport)?;
        }
        atyp => {
            return Err(Error::transport(format!("SOCKS5 reply carries unknown address type {atyp:#04x}")));
        }
    }
    Ok(())
}
