//! errtrap demo
//!
//! Wraps a failing method on a small account type, records a few failures,
//! prints the registry to standard error and clears it.

use {
    anyhow::Result,
    serde::Serialize,
    thiserror::Error,
    tracing::{info, warn},
    tracing_subscriber::EnvFilter,
};

use errtrap::{ErrorRegistry, ErrorReporter, Observer, SettingsManager, catch_error};

#[derive(Error, Debug)]
enum AccountError {
    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: u64, requested: u64 },
    #[error("account {0} is frozen")]
    Frozen(String),
}

#[derive(Serialize)]
struct Account {
    owner: String,
    balance: u64,
    frozen: bool,
}

impl Account {
    fn withdraw(&mut self, amount: u64) -> Result<u64, AccountError> {
        if self.frozen {
            return Err(AccountError::Frozen(self.owner.clone()));
        }
        if amount > self.balance {
            return Err(AccountError::InsufficientFunds {
                balance: self.balance,
                requested: amount,
            });
        }
        self.balance -= amount;
        Ok(self.balance)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("errtrap=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let settings = SettingsManager::new().map_or_else(
        |e| {
            warn!(error = %e, "failed to load settings, using defaults");
            Default::default()
        },
        |manager| manager.get_settings().clone(),
    );
    info!(failure_mode = ?settings.failure_mode, "settings loaded");

    let registry = ErrorRegistry::with_settings(settings);
    let announcer = Observer::from_fn(|entry| {
        info!("{}", ErrorReporter::to_user_message(entry));
    });
    registry.register_observer(announcer.clone());

    let withdraw = catch_error!(registry.catch_error(), mut Account::withdraw);
    let mut account = Account {
        owner: "alice".to_string(),
        balance: 100,
        frozen: false,
    };

    for amount in [30, 90, 20] {
        match withdraw.call(&mut account, (amount,)) {
            Ok(Some(balance)) => info!(amount, balance, "withdrawal succeeded"),
            Ok(None) => info!(amount, "withdrawal failed and was recorded"),
            Err(e) => warn!(amount, error = %e, "withdrawal failed"),
        }
    }

    registry.unregister_observer(&announcer);
    account.frozen = true;
    if let Err(e) = withdraw.call(&mut account, (10,)) {
        warn!(error = %e, "withdrawal failed");
    }

    info!(entries = registry.len(), "printing registry");
    registry.log_registry()?;
    registry.clear_registry();

    Ok(())
}
