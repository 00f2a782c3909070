use serde::{Deserialize, Serialize};
use url::Url;

/// Deep link opening a chat with a fixed contact identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessagingLink {
    /// Phone-shaped contact identity, digits only (e.g. "905444020605").
    pub contact: String,
}

impl MessagingLink {
    pub fn new(contact: impl Into<String>) -> Self {
        Self {
            contact: contact.into(),
        }
    }

    pub fn url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!("https://wa.me/{}", self.contact))
    }
}

/// One physical branch shown in the contact side panel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Branch {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
}

impl Branch {
    /// Static map search-query URL for the branch address.
    pub fn map_url(&self) -> Result<Url, url::ParseError> {
        let mut url = Url::parse("https://maps.google.com/")?;
        url.query_pairs_mut().append_pair("q", &self.address);
        Ok(url)
    }
}
