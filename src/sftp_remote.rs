use std::{
    fs::File,
    io::{self, Read, Write},
    net::TcpStream,
    path::Path,
};

use crate::{
    cancel::CancelContext,
    remote::{RemoteError, RemoteSession, SessionParams},
};
use ssh2::{ErrorCode, Session, Sftp};

// libssh2 status code for a missing remote path
const SFTP_NO_SUCH_FILE: i32 = 2;
const CHUNK_SIZE: usize = 64 * 1024;

pub struct SftpSession {
    session: Session,
    sftp: Sftp,
    ctx: CancelContext,
}

impl SftpSession {
    pub fn connect(params: &SessionParams) -> Result<Self, RemoteError> {
        log::info!("Connecting to SFTP server: {}:{}", params.host, params.port);

        let tcp = TcpStream::connect((params.host.as_str(), params.port))
            .map_err(|err| RemoteError::Transport(err.to_string()))?;

        let mut session = Session::new().map_err(|err| RemoteError::Transport(err.to_string()))?;
        // a stalled listing or transfer has to surface as an error
        let timeout_ms = params.timeout_secs.saturating_mul(1000).min(u32::MAX as u64) as u32;
        session.set_timeout(timeout_ms);
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|err| RemoteError::Transport(err.to_string()))?;

        session
            .userauth_password(&params.user, &params.password)
            .map_err(|err| RemoteError::Authentication(err.to_string()))?;
        if !session.authenticated() {
            return Err(RemoteError::Authentication(format!(
                "server rejected credentials for {}",
                params.user
            )));
        }

        let sftp = session
            .sftp()
            .map_err(|err| RemoteError::Transport(err.to_string()))?;

        log::info!("SFTP connection successful.");
        Ok(SftpSession {
            session,
            sftp,
            ctx: CancelContext::new(),
        })
    }

    /// Transfers stop at the next chunk once `ctx` is cancelled.
    pub fn with_cancel_context(mut self, ctx: CancelContext) -> Self {
        self.ctx = ctx;
        self
    }
}

impl RemoteSession for SftpSession {
    fn list(&self, dir: &str) -> Result<Vec<String>, RemoteError> {
        let entries = self.sftp.readdir(Path::new(dir)).map_err(|err| {
            if err.code() == ErrorCode::SFTP(SFTP_NO_SUCH_FILE) {
                RemoteError::NotFound(dir.to_owned())
            } else {
                RemoteError::Listing {
                    path: dir.to_owned(),
                    message: err.to_string(),
                }
            }
        })?;

        let fnames = entries
            .into_iter()
            .filter_map(|(pth, _stat)| {
                pth.file_name()
                    .map(|fname| fname.to_string_lossy().into_owned())
            })
            .collect();

        Ok(fnames)
    }

    fn get(&self, remote_path: &str, local_path: &Path) -> Result<(), RemoteError> {
        let transfer_err = |message: String| RemoteError::Transfer {
            path: remote_path.to_owned(),
            message,
        };

        let mut remote = self
            .sftp
            .open(Path::new(remote_path))
            .map_err(|err| transfer_err(err.to_string()))?;
        let mut local = File::create(local_path).map_err(|err| transfer_err(err.to_string()))?;

        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            if self.ctx.is_cancelled() {
                return Err(transfer_err("interrupted".into()));
            }

            let n = match remote.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(transfer_err(err.to_string())),
            };
            local
                .write_all(&buf[..n])
                .map_err(|err| transfer_err(err.to_string()))?;
        }

        local
            .sync_all()
            .map_err(|err| transfer_err(err.to_string()))?;

        Ok(())
    }

    fn close(&mut self) {
        log::info!("Closing SFTP connection.");
        if let Err(err) = self.session.disconnect(None, "closing", None) {
            log::warn!("Error while disconnecting: {}", err);
        }
    }
}
