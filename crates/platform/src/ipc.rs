// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Platform-neutral local IPC endpoint.
//!
//! On POSIX the endpoint path is a Unix domain socket restricted to the
//! owning user. On Windows it is a record file holding the name of a
//! freshly generated named pipe, so dialers can discover the pipe without
//! a fixed global name.

use std::io;
use std::path::Path;

/// Listener side of the IPC endpoint.
pub struct IpcListener {
    inner: imp::Listener,
}

impl IpcListener {
    /// Accept the next client connection.
    pub async fn accept(&mut self) -> io::Result<IpcStream> {
        self.inner.accept().await
    }
}

/// A single accepted or dialed IPC connection.
pub type IpcStream = imp::Stream;

/// Create the endpoint and start listening.
///
/// The caller (the daemon-lock holder) is responsible for having removed
/// any stale endpoint via [`remove_stale_endpoint`] first.
pub async fn listen(endpoint: &Path) -> io::Result<IpcListener> {
    Ok(IpcListener { inner: imp::listen(endpoint).await? })
}

/// Dial the endpoint.
pub async fn dial(endpoint: &Path) -> io::Result<IpcStream> {
    imp::dial(endpoint).await
}

/// Remove a stale endpoint left behind by a dead daemon.
pub fn remove_stale_endpoint(endpoint: &Path) -> io::Result<()> {
    if endpoint.exists() {
        std::fs::remove_file(endpoint)?;
    }
    Ok(())
}

#[cfg(unix)]
mod imp {
    use std::io;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    use tokio::net::{UnixListener, UnixStream};

    pub struct Listener {
        listener: UnixListener,
    }

    pub type Stream = UnixStream;

    impl Listener {
        pub async fn accept(&mut self) -> io::Result<Stream> {
            let (stream, _) = self.listener.accept().await?;
            Ok(stream)
        }
    }

    pub async fn listen(endpoint: &Path) -> io::Result<Listener> {
        let listener = UnixListener::bind(endpoint)?;
        std::fs::set_permissions(endpoint, std::fs::Permissions::from_mode(0o600))?;
        Ok(Listener { listener })
    }

    pub async fn dial(endpoint: &Path) -> io::Result<Stream> {
        UnixStream::connect(endpoint).await
    }
}

#[cfg(windows)]
mod imp {
    use std::io;
    use std::path::Path;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
    use tokio::net::windows::named_pipe::{ClientOptions, NamedPipeClient, NamedPipeServer, ServerOptions};
    use uuid::Uuid;

    pub struct Listener {
        name: String,
        server: Option<NamedPipeServer>,
    }

    pub enum Stream {
        Server(NamedPipeServer),
        Client(NamedPipeClient),
    }

    impl Listener {
        pub async fn accept(&mut self) -> io::Result<Stream> {
            let server = match self.server.take() {
                Some(server) => server,
                None => ServerOptions::new().create(&self.name)?,
            };
            server.connect().await?;
            self.server = Some(ServerOptions::new().create(&self.name)?);
            Ok(Stream::Server(server))
        }
    }

    pub async fn listen(endpoint: &Path) -> io::Result<Listener> {
        let name = format!(r"\\.\pipe\mutagen-{}", Uuid::new_v4());
        let server = ServerOptions::new().first_pipe_instance(true).create(&name)?;
        // Persist the pipe name so dialers can discover it.
        std::fs::write(endpoint, &name)?;
        Ok(Listener { name, server: Some(server) })
    }

    pub async fn dial(endpoint: &Path) -> io::Result<Stream> {
        let name = std::fs::read_to_string(endpoint)?;
        Ok(Stream::Client(ClientOptions::new().open(name.trim())?))
    }

    impl AsyncRead for Stream {
        fn poll_read(
            self: Pin<&mut Self>,
            context: &mut Context<'_>,
            buffer: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            match self.get_mut() {
                Stream::Server(stream) => Pin::new(stream).poll_read(context, buffer),
                Stream::Client(stream) => Pin::new(stream).poll_read(context, buffer),
            }
        }
    }

    impl AsyncWrite for Stream {
        fn poll_write(
            self: Pin<&mut Self>,
            context: &mut Context<'_>,
            buffer: &[u8],
        ) -> Poll<io::Result<usize>> {
            match self.get_mut() {
                Stream::Server(stream) => Pin::new(stream).poll_write(context, buffer),
                Stream::Client(stream) => Pin::new(stream).poll_write(context, buffer),
            }
        }

        fn poll_flush(self: Pin<&mut Self>, context: &mut Context<'_>) -> Poll<io::Result<()>> {
            match self.get_mut() {
                Stream::Server(stream) => Pin::new(stream).poll_flush(context),
                Stream::Client(stream) => Pin::new(stream).poll_flush(context),
            }
        }

        fn poll_shutdown(self: Pin<&mut Self>, context: &mut Context<'_>) -> Poll<io::Result<()>> {
            match self.get_mut() {
                Stream::Server(stream) => Pin::new(stream).poll_shutdown(context),
                Stream::Client(stream) => Pin::new(stream).poll_shutdown(context),
            }
        }
    }
}

#[cfg(test)]
#[path = "ipc_tests.rs"]
mod tests;
