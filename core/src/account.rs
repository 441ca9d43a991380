use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::envelope::Resource;
use crate::error::Result;
use crate::request::Endpoint;
use crate::transport::Transport;

/// The account the credentials belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
}

impl Resource for Account {
    const KEY: &'static str = "account";
    const PLURAL: &'static str = "accounts";
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GetAccountRequest;

impl Endpoint for GetAccountRequest {
    fn path(&self) -> String {
        "/account".to_string()
    }
}

impl<T: Transport> Client<T> {
    /// `GET /account`.
    pub fn get_account(&self) -> Result<Account> {
        self.get(&GetAccountRequest)
    }
}
