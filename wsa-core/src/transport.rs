//! Каналы связи с инструментом.
//!
//! Командный канал: текстовые запросы, по одной строке ответа на запрос.
//! Канал данных: непрерывный поток VRT пакетов.
//!
//! Все чтения блокирующие с таймаутом. Таймаут до первого байта даёт
//! [`WsaError::NoResponse`], закрытие соединения до первого байта даёт
//! [`WsaError::ConnectionDropped`].

use std::{
    io::{BufRead, BufReader, ErrorKind, Read, Write},
    net::{TcpStream, ToSocketAddrs},
    time::{Duration, Instant},
};

use log::{debug, trace};
use wsa_types::{WsaError, WsaResult};

/// Порт командного канала по умолчанию
pub const WSA_COMMAND_PORT: u16 = 37001;
/// Порт канала данных по умолчанию
pub const WSA_DATA_PORT: u16 = 37000;

/// Канал запрос/ответ.
pub trait CommandChannel {
    /// Отправляет команду без ожидания ответа.
    fn send(
        &mut self,
        cmd: &str,
    ) -> WsaResult<()>;

    /// Отправляет запрос и возвращает одну строку ответа без перевода строки.
    fn query(
        &mut self,
        cmd: &str,
    ) -> WsaResult<String>;
}

/// Поток байт канала данных.
pub trait DataChannel {
    /// Читает до `buf.len()` байт за время не больше `timeout`.
    ///
    /// Возвращает число прочитанных байт. Оно меньше `buf.len()`, если таймаут
    /// или конец потока наступили после первого байта.
    fn recv_exact(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> WsaResult<usize>;
}

impl<T: CommandChannel + ?Sized> CommandChannel for Box<T> {
    fn send(
        &mut self,
        cmd: &str,
    ) -> WsaResult<()> {
        (**self).send(cmd)
    }

    fn query(
        &mut self,
        cmd: &str,
    ) -> WsaResult<String> {
        (**self).query(cmd)
    }
}

impl<T: DataChannel + ?Sized> DataChannel for Box<T> {
    fn recv_exact(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> WsaResult<usize> {
        (**self).recv_exact(buf, timeout)
    }
}

fn is_timeout(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

fn connect(
    host: &str,
    port: u16,
    timeout: Duration,
) -> WsaResult<TcpStream> {
    let mut last_err = None;

    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                stream.set_nodelay(true)?;
                debug!("Connected to {addr}");
                return Ok(stream);
            }
            Err(e) => last_err = Some(e),
        }
    }

    Err(match last_err {
        Some(e) => WsaError::Io(e),
        None => WsaError::format_violation(format!("No address resolved for '{host}'")),
    })
}

////////////////////////////////////////////////////////////////////////////////
// TCP
////////////////////////////////////////////////////////////////////////////////

/// Командный канал поверх TCP (SCPI, строки завершаются `\n`).
pub struct TcpCommandChannel {
    writer: TcpStream,
    reader: BufReader<TcpStream>,
    timeout: Duration,
}

impl TcpCommandChannel {
    pub fn connect(
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> WsaResult<Self> {
        let stream = connect(host, port, timeout)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;

        Ok(Self {
            reader: BufReader::new(stream.try_clone()?),
            writer: stream,
            timeout,
        })
    }
}

impl CommandChannel for TcpCommandChannel {
    fn send(
        &mut self,
        cmd: &str,
    ) -> WsaResult<()> {
        trace!("-> {cmd}");
        self.writer.write_all(cmd.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn query(
        &mut self,
        cmd: &str,
    ) -> WsaResult<String> {
        self.send(cmd)?;

        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => Err(WsaError::ConnectionDropped),
            Ok(_) => {
                let reply = line.trim_end_matches(['\r', '\n']).to_string();
                trace!("<- {reply}");
                Ok(reply)
            }
            Err(e) if is_timeout(e.kind()) => Err(WsaError::NoResponse(self.timeout)),
            Err(e) => Err(WsaError::Io(e)),
        }
    }
}

/// Канал данных поверх TCP.
pub struct TcpDataChannel {
    stream: TcpStream,
}

impl TcpDataChannel {
    pub fn connect(
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> WsaResult<Self> {
        Ok(Self {
            stream: connect(host, port, timeout)?,
        })
    }
}

impl DataChannel for TcpDataChannel {
    fn recv_exact(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> WsaResult<usize> {
        let deadline = Instant::now() + timeout;
        let mut got = 0;

        while got < buf.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            self.stream.set_read_timeout(Some(remaining))?;

            match self.stream.read(&mut buf[got..]) {
                Ok(0) if got == 0 => return Err(WsaError::ConnectionDropped),
                Ok(0) => break,
                Ok(n) => got += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if is_timeout(e.kind()) => break,
                Err(e) => return Err(WsaError::Io(e)),
            }
        }

        if got == 0 && !buf.is_empty() {
            return Err(WsaError::NoResponse(timeout));
        }

        Ok(got)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Произвольный Read (файлы, буферы в памяти)
////////////////////////////////////////////////////////////////////////////////

/// Канал данных поверх любого [`Read`]; таймаут не используется.
pub struct ReadChannel<R: Read> {
    inner: R,
}

impl<R: Read> ReadChannel<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> DataChannel for ReadChannel<R> {
    fn recv_exact(
        &mut self,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> WsaResult<usize> {
        let mut got = 0;

        while got < buf.len() {
            match self.inner.read(&mut buf[got..]) {
                Ok(0) if got == 0 => return Err(WsaError::ConnectionDropped),
                Ok(0) => break,
                Ok(n) => got += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(WsaError::Io(e)),
            }
        }

        Ok(got)
    }
}
