//! TLS configuration and certificate loading.

use axum_server::tls_rustls::RustlsConfig;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

/// Load TLS configuration from PEM certificate and key files.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, io::Error> {
    check_certificates(cert_path)?;
    check_private_key(key_path)?;

    RustlsConfig::from_pem_file(cert_path, key_path).await
}

/// The certificate file must exist and hold at least one certificate.
fn check_certificates(path: &Path) -> Result<(), io::Error> {
    let mut reader = BufReader::new(open(path, "Certificate")?);
    let certs = rustls_pemfile::certs(&mut reader).collect::<Result<Vec<_>, _>>()?;
    if certs.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("No certificates found in {:?}", path),
        ));
    }
    Ok(())
}

/// The key file must exist and hold a private key.
fn check_private_key(path: &Path) -> Result<(), io::Error> {
    let mut reader = BufReader::new(open(path, "Private key")?);
    match rustls_pemfile::private_key(&mut reader)? {
        Some(_) => Ok(()),
        None => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("No private key found in {:?}", path),
        )),
    }
}

fn open(path: &Path, what: &str) -> Result<File, io::Error> {
    File::open(path).map_err(|e| {
        io::Error::new(e.kind(), format!("{what} file {:?} unreadable: {e}", path))
    })
}
