use crate::core::model::collection::DEFAULT_VECTOR_SIZE;
use clap::Parser;
use std::num::NonZeroUsize;

/// The default address to listen on.
const DEFAULT_ADDRESS: &str = "0.0.0.0:8000";

#[derive(Debug, Parser)]
#[command(name = "vecgate", version = "0.1", about = "HTTP gateway for vector collections", long_about = None)]
pub struct StartArgs {
    /// RUST_LOG string to use as the env filter.
    #[arg(short, long)]
    log: Option<String>,

    /// Address to listen on.
    #[arg(short, long)]
    address: Option<String>,

    /// CORS allowed origins. Any origin is allowed if not set.
    #[arg(long)]
    cors_allowed_origins: Option<String>,

    /// Qdrant URL.
    #[arg(short, long)]
    qdrant_url: Option<String>,

    /// Vector size for collections created without a configuration.
    #[arg(long)]
    default_vector_size: Option<NonZeroUsize>,
}

/// Implement a getter method on [StartArgs], using the `$var` environment variable as a fallback
/// and either panic or default if neither the argument nor the environment variable is set.
macro_rules! arg {
    ($id:ident, $var:literal, panic $msg:literal) => {
        impl StartArgs {
            pub fn $id(&self) -> String {
                match &self.$id {
                    Some(val) => val.to_string(),
                    None => match std::env::var($var) {
                        Ok(val) => val,
                        Err(_) => panic!($msg),
                    },
                }
            }
        }
    };
    ($id:ident, $var:literal, default $value:expr) => {
        impl StartArgs {
            pub fn $id(&self) -> String {
                match &self.$id {
                    Some(val) => val.to_string(),
                    None => match std::env::var($var) {
                        Ok(val) => val,
                        Err(_) => $value,
                    },
                }
            }
        }
    };
}

impl StartArgs {
    /// An empty list means any origin is allowed.
    pub fn allowed_origins(&self) -> Vec<String> {
        let origins = match &self.cors_allowed_origins {
            Some(origins) => origins.clone(),
            None => std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default(),
        };
        origins
            .split(',')
            .filter_map(|o| (!o.is_empty()).then_some(String::from(o)))
            .collect()
    }

    /// Panics if `DEFAULT_VECTOR_SIZE` is set to anything other than a positive integer.
    pub fn default_vector_size(&self) -> usize {
        if let Some(size) = self.default_vector_size {
            return size.get();
        }
        match std::env::var("DEFAULT_VECTOR_SIZE") {
            Ok(size) => size
                .parse::<NonZeroUsize>()
                .expect("DEFAULT_VECTOR_SIZE must be a positive integer")
                .get(),
            Err(_) => DEFAULT_VECTOR_SIZE,
        }
    }
}

arg!(log,        "RUST_LOG",   default "info".to_string());
arg!(address,    "ADDRESS",    default DEFAULT_ADDRESS.to_string());
arg!(qdrant_url, "QDRANT_URL", panic   "Qdrant url not found; Pass --qdrant-url or set QDRANT_URL");
