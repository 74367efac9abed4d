use serde::Deserialize;
use url::Url;

#[derive(Deserialize, Clone, Debug)]
pub enum DocumentBackend {
    Sqlite {
        url: String,
    },
    D1 {
        account_id: String,
        database_id: String,
    },
}

#[derive(Deserialize, Clone, Debug)]
pub enum BlobBackend {
    Sqlite {
        url: String,
        public_base: Url,
    },
    R2 {
        account_id: String,
        bucket: String,
        public_base: Url,
    },
}

fn default_posts() -> String {
    "blogs".to_owned()
}

fn default_promotions() -> String {
    "promotions".to_owned()
}

fn default_jobs() -> String {
    "jobs".to_owned()
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Collections {
    #[serde(default = "default_posts")]
    pub posts: String,
    #[serde(default = "default_promotions")]
    pub promotions: String,
    #[serde(default = "default_jobs")]
    pub jobs: String,
}

impl Default for Collections {
    fn default() -> Self {
        Self {
            posts: default_posts(),
            promotions: default_promotions(),
            jobs: default_jobs(),
        }
    }
}

/// The single administrator account. The password is stored as a blake3 hex digest.
#[derive(Deserialize, Clone, Debug)]
pub struct Admin {
    pub email: String,
    pub name: Option<String>,
    pub password_blake3: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub documents: DocumentBackend,
    pub blobs: BlobBackend,
    #[serde(default)]
    pub collections: Collections,
    pub admin: Admin,
}

impl Config {
    pub fn validate(&self) -> Result<(), String> {
        let public_base = match &self.blobs {
            BlobBackend::Sqlite { public_base, .. } | BlobBackend::R2 { public_base, .. } => {
                public_base
            }
        };
        if !public_base.path().ends_with('/') {
            return Err(format!("public_base must end with '/': {public_base}"));
        }
        let Collections {
            posts,
            promotions,
            jobs,
        } = &self.collections;
        for name in [posts, promotions, jobs] {
            if name.trim().is_empty() {
                return Err("collection names must not be blank".to_owned());
            }
        }
        if posts == promotions || posts == jobs || promotions == jobs {
            return Err("collection names must be distinct".to_owned());
        }
        if blake3::Hash::from_hex(&self.admin.password_blake3).is_err() {
            return Err("admin.password_blake3 must be a 64 character hex digest".to_owned());
        }
        Ok(())
    }
}
