//! Client side of the line protocol: send one request, read back one frame

use log::debug;
use shared::{Frame, ProtocolError, Request, Response};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad response from server: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("server closed the connection")]
    Closed,
}

pub struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Connection {
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = stream.into_split();
        Ok(Connection {
            reader: BufReader::new(reader),
            writer,
        })
    }

    pub async fn send(&mut self, request: &Request) -> Result<(), ClientError> {
        debug!("-> {}", request);
        let mut line = request.to_string();
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;
        Ok(())
    }

    /// Reads one complete response frame
    pub async fn receive(&mut self) -> Result<Response, ClientError> {
        let header = self.read_line().await?;
        let (head, count) = Frame::parse_header(&header)?;

        let mut body = Vec::with_capacity(count);
        for _ in 0..count {
            body.push(self.read_line().await?);
        }

        let response = Response::from_frame(&Frame { head, body })?;
        debug!("<- {:?}", response);
        Ok(response)
    }

    /// Sends a request and waits for its answer
    pub async fn request(&mut self, request: &Request) -> Result<Response, ClientError> {
        self.send(request).await?;
        self.receive().await
    }

    async fn read_line(&mut self) -> Result<String, ClientError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Err(ClientError::Closed);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(line)
    }
}
