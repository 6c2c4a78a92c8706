use crate::errors::IndexerError;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// GraphQL query for mint records owned by one address.
const OWNED_MEMES_QUERY: &str = r#"
query GetUserMemes($owner: String!) {
  memeNFTS(
    limit: 1000
    orderBy: "id"
    orderDirection: "desc"
    where: { owner: $owner }
  ) {
    items {
      owner
      tokenId
      tokenURI
    }
  }
}
"#;

/// One minted meme as recorded by the indexer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedMeme {
    pub owner: String,
    pub token_id: String,
    #[serde(rename = "tokenURI")]
    pub token_uri: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<MemesData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct MemesData {
    #[serde(rename = "memeNFTS")]
    meme_nfts: MemeItems,
}

#[derive(Debug, Deserialize)]
struct MemeItems {
    items: Vec<OwnedMeme>,
}

/// Read-only client for the external mint indexer. Minted NFTs are never
/// persisted locally; this is the only view of them.
#[derive(Debug, Clone)]
pub struct IndexerClient {
    http: reqwest::Client,
    endpoint: String,
}

impl IndexerClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Token id / token URI pairs for every meme owned by `owner`, newest
    /// first.
    pub async fn memes_of(&self, owner: Address) -> Result<Vec<OwnedMeme>, IndexerError> {
        let payload = json!({
            "query": OWNED_MEMES_QUERY,
            "variables": { "owner": owner.to_string() },
        });
        let response = self.http.post(&self.endpoint).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(IndexerError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: GraphQlResponse = response.json().await?;
        let memes = unwrap_response(body)?;
        tracing::debug!(owner = %owner, count = memes.len(), "Fetched owned memes from indexer");
        Ok(memes)
    }
}

fn unwrap_response(body: GraphQlResponse) -> Result<Vec<OwnedMeme>, IndexerError> {
    if !body.errors.is_empty() {
        let message = body
            .errors
            .into_iter()
            .map(|error| error.message)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(IndexerError::Query(message));
    }
    let data = body
        .data
        .ok_or_else(|| IndexerError::Malformed("response carried neither data nor errors".to_string()))?;
    Ok(data.meme_nfts.items)
}
