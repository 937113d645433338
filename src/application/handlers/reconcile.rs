//! ReconciliationSweep and ExpiryReaper - periodic repair and cleanup.
//!
//! The sweep finishes work that a crash or outage left half done:
//! succeeded orders without an account, and emptied accounts whose address
//! is still routed. The reaper deletes expired accounts, which emits the
//! `REMOVE` records that take their addresses off the route.

use std::sync::Arc;

use crate::application::mail_route_sync::{MailRouteSyncHandle, RouteChange};
use crate::domain::account::MailDomain;
use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{AccountRepository, OrderRepository};

use super::provision_account::AccountProvisioner;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub provisioned: usize,
    pub deactivated: usize,
    pub failures: usize,
}

pub struct ReconciliationSweep {
    orders: Arc<dyn OrderRepository>,
    accounts: Arc<dyn AccountRepository>,
    provisioner: AccountProvisioner,
    routes: MailRouteSyncHandle,
    domain: MailDomain,
    batch_size: u32,
}

impl ReconciliationSweep {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        accounts: Arc<dyn AccountRepository>,
        provisioner: AccountProvisioner,
        routes: MailRouteSyncHandle,
        domain: MailDomain,
        batch_size: u32,
    ) -> Self {
        Self {
            orders,
            accounts,
            provisioner,
            routes,
            domain,
            batch_size,
        }
    }

    /// One pass. Per-item failures are counted and logged; only a failed
    /// listing aborts the pass.
    pub async fn run_once(&self) -> Result<SweepReport, DomainError> {
        let mut report = SweepReport::default();

        for order in self.orders.find_awaiting_provisioning(self.batch_size).await? {
            match self.provisioner.provision(&order).await {
                Ok(_) => report.provisioned += 1,
                Err(e) => {
                    report.failures += 1;
                    tracing::error!(order_id = %order.id, error = %e, "Sweep could not provision order");
                }
            }
        }

        for account_id in self.accounts.find_without_recipients(self.batch_size).await? {
            let address = self.domain.address_for(&account_id);
            let change = match self.routes.deactivate(&address).await {
                Ok(change) => change,
                Err(e) => {
                    report.failures += 1;
                    tracing::error!(account_id = %account_id, error = %e, "Sweep could not deactivate account");
                    continue;
                }
            };
            if let Err(e) = self.accounts.mark_route_released(&account_id).await {
                report.failures += 1;
                tracing::error!(account_id = %account_id, error = %e, "Sweep could not record released route");
                continue;
            }
            if change == RouteChange::Removed {
                report.deactivated += 1;
                tracing::info!(account_id = %account_id, "Sweep deactivated emptied account");
            }
        }

        if report != SweepReport::default() {
            tracing::info!(
                provisioned = report.provisioned,
                deactivated = report.deactivated,
                failures = report.failures,
                "Reconciliation sweep finished"
            );
        }
        Ok(report)
    }
}

pub struct ExpiryReaper {
    accounts: Arc<dyn AccountRepository>,
    batch_size: u32,
}

impl ExpiryReaper {
    pub fn new(accounts: Arc<dyn AccountRepository>, batch_size: u32) -> Self {
        Self {
            accounts,
            batch_size,
        }
    }

    /// Deletes accounts expired as of `now`. Returns how many were removed.
    pub async fn run_once(&self, now: Timestamp) -> Result<usize, DomainError> {
        let mut removed = 0;
        for account_id in self.accounts.find_expired(now, self.batch_size).await? {
            match self.accounts.delete(&account_id).await {
                Ok(true) => {
                    removed += 1;
                    tracing::info!(account_id = %account_id, "Expired account removed");
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(account_id = %account_id, error = %e, "Could not remove expired account");
                }
            }
        }
        Ok(removed)
    }
}
