//! Last line of defence
//!
//! The whole app runs inside `guard`. A panic or an error nobody handled
//! becomes a `Crash`, and the user picks how to recover instead of being
//! dropped to a backtrace.

use crate::session::SessionStorage;
use anyhow::Result;
use std::any::Any;
use std::fmt;
use std::future::Future;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    ReturnHome,
    /// Wipe persisted session state, then start over
    ClearCacheAndReload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crash {
    pub message: String,
    pub panicked: bool,
}

impl fmt::Display for Crash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Something went wrong.")?;
        writeln!(f, "  {}", self.message)?;
        writeln!(f)?;
        writeln!(f, "  [home]   Return to the home page")?;
        write!(f, "  [reset]  Clear local cache and reload")
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run `fut` on its own task, turning panics and errors into a `Crash`
pub async fn guard<F, T>(fut: F) -> std::result::Result<T, Crash>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    match tokio::spawn(fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            error!("Unhandled error: {:#}", e);
            Err(Crash {
                message: format!("{:#}", e),
                panicked: false,
            })
        }
        Err(join_error) if join_error.is_panic() => {
            let message = panic_message(join_error.into_panic().as_ref());
            error!("Panic: {}", message);
            Err(Crash {
                message,
                panicked: true,
            })
        }
        Err(join_error) => Err(Crash {
            message: join_error.to_string(),
            panicked: false,
        }),
    }
}

/// Carry out the user's choice from the recovery screen, then start over
///
/// `home` is built by the caller and only polled after the cache is
/// cleared, so it sees the storage as the user left it. It runs under
/// `guard` like the first attempt did.
pub async fn recover<F, T>(action: RecoveryAction, storage: &dyn SessionStorage, home: F) -> std::result::Result<T, Crash>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    match action {
        RecoveryAction::ReturnHome => info!("Returning to home page"),
        RecoveryAction::ClearCacheAndReload => {
            if let Err(e) = storage.clear().await {
                error!("Could not clear local cache: {:#}", e);
                return Err(Crash {
                    message: format!("Could not clear local cache: {:#}", e),
                    panicked: false,
                });
            }
            info!("Cleared local cache, reloading");
        }
    }
    guard(home).await
}

impl std::str::FromStr for RecoveryAction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "home" | "h" | "" => Ok(RecoveryAction::ReturnHome),
            "reset" | "r" | "clear" => Ok(RecoveryAction::ClearCacheAndReload),
            other => Err(format!("unknown choice: {}", other)),
        }
    }
}
