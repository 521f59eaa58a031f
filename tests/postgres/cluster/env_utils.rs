//! Environment preparation for the embedded cluster bootstrap.

use super::BoxError;
use pg_embedded_setup_unpriv::{ExecutionPrivileges, detect_execution_privileges};
use std::ffi::OsString;
use std::net::TcpListener;

const WORKER_VAR: &str = "PG_EMBEDDED_WORKER";

pub(super) fn env_vars_to_os(
    env_vars: &[(String, Option<String>)],
) -> Vec<(OsString, Option<OsString>)> {
    env_vars
        .iter()
        .map(|(key, value)| (OsString::from(key), value.as_ref().map(OsString::from)))
        .collect()
}

/// Variables the bootstrap needs: a free `PG_PORT` unless one is pinned.
///
/// Root runs delegate to a privilege-dropping worker that must be named by
/// `PG_EMBEDDED_WORKER`.
pub(super) fn bootstrap_env() -> Result<Vec<(OsString, Option<OsString>)>, BoxError> {
    if matches!(detect_execution_privileges(), ExecutionPrivileges::Root)
        && std::env::var_os(WORKER_VAR).is_none()
    {
        return Err(Box::new(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("running as root requires {WORKER_VAR} to name a pg_worker binary"),
        )));
    }

    if std::env::var_os("PG_PORT").is_some() {
        return Ok(Vec::new());
    }
    Ok(vec![(OsString::from("PG_PORT"), Some(free_port()?))])
}

fn free_port() -> Result<OsString, BoxError> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).map_err(|err| Box::new(err) as BoxError)?;
    let port = listener
        .local_addr()
        .map_err(|err| Box::new(err) as BoxError)?
        .port();
    Ok(OsString::from(port.to_string()))
}
