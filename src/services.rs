//! Collaborators that sit beside the query builder. They are injected into
//! [`Client`](crate::Client) explicitly; the default [`Unimplemented`]
//! provider answers every call with [`Error::NotImplemented`].

use async_trait::async_trait;
use serde_json::Value;

use crate::{Error, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub user: Value,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn session(&self) -> Result<Option<Session>>;
    async fn sign_out(&self) -> Result<()>;
}

#[async_trait]
pub trait StorageProvider: Send + Sync {
    async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>) -> Result<String>;
    async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>>;
    fn public_url(&self, bucket: &str, path: &str) -> Result<String>;
}

#[async_trait]
pub trait RealtimeProvider: Send + Sync {
    async fn subscribe(&self, channel: &str) -> Result<()>;
    async fn unsubscribe(&self, channel: &str) -> Result<()>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Unimplemented;

#[async_trait]
impl AuthProvider for Unimplemented {
    async fn session(&self) -> Result<Option<Session>> {
        Err(Error::NotImplemented("auth.session"))
    }

    async fn sign_out(&self) -> Result<()> {
        Err(Error::NotImplemented("auth.sign_out"))
    }
}

#[async_trait]
impl StorageProvider for Unimplemented {
    async fn upload(&self, _bucket: &str, _path: &str, _bytes: Vec<u8>) -> Result<String> {
        Err(Error::NotImplemented("storage.upload"))
    }

    async fn download(&self, _bucket: &str, _path: &str) -> Result<Vec<u8>> {
        Err(Error::NotImplemented("storage.download"))
    }

    fn public_url(&self, _bucket: &str, _path: &str) -> Result<String> {
        Err(Error::NotImplemented("storage.public_url"))
    }
}

#[async_trait]
impl RealtimeProvider for Unimplemented {
    async fn subscribe(&self, _channel: &str) -> Result<()> {
        Err(Error::NotImplemented("realtime.subscribe"))
    }

    async fn unsubscribe(&self, _channel: &str) -> Result<()> {
        Err(Error::NotImplemented("realtime.unsubscribe"))
    }
}
