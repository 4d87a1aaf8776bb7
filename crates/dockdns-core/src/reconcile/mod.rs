//! DNS reconciliation core
//!
//! The Reconciler makes a registrar's authoritative A-record for a single
//! FQDN match a desired target IP, using only the two primitives the
//! registrar offers: "fetch full record set" and "replace full record set".
//!
//! ## Flow per `ensure_binding(fqdn, target_ip)`
//!
//! ```text
//! split fqdn → (sub, domain)
//!          │
//!          ▼
//! fetch full record set for domain
//!          │
//!          ├─ A record for sub, address == target  →  no-op, zero submissions
//!          │
//!          ├─ A record for sub, address differs    →  delete-then-add:
//!          │     filter the record out of the set
//!          │     verify exactly one record was removed (delta guard)
//!          │     submit the filtered set
//!          │     re-fetch, append the new record, submit again
//!          │
//!          └─ no A record for sub                  →  append + single submission
//! ```
//!
//! ## Why full-set round-trips
//!
//! The registrar has no partial-update primitive, so every mutation must
//! round-trip the entire record list. Read-then-write races between
//! concurrent reconciles on the same domain are therefore possible and
//! accepted; the delta-of-exactly-1 guard is the only integrity check
//! available. No lock is taken, and none should be added without a
//! requirement change.
//!
//! There is no rollback: if the delete submission succeeds and the add
//! submission fails, the domain is left without the record until the next
//! reconcile.

use crate::error::{Error, Result};
use crate::traits::{DomainKey, HostRecord, Registrar};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of a reconcile operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The record already pointed at the target IP (zero submissions)
    Unchanged {
        /// The address the registrar already held
        current_ip: String,
    },
    /// No record existed; one was added (one submission)
    Created,
    /// A record with a different address was replaced (two submissions)
    Replaced {
        /// The address the stale record held
        previous_ip: String,
    },
}

/// Split an FQDN into its leading subdomain label and the remaining domain.
///
/// "app.example.com" → ("app", example.com). The remainder must itself
/// split into SLD and TLD, so the FQDN needs at least three labels.
pub fn split_fqdn(fqdn: &str) -> Result<(String, DomainKey)> {
    let (sub, rest) = fqdn.split_once('.').ok_or_else(|| {
        Error::invalid_input(format!("fqdn '{}' has no dot separator", fqdn))
    })?;

    if sub.is_empty() {
        return Err(Error::invalid_input(format!(
            "fqdn '{}' has an empty subdomain label",
            fqdn
        )));
    }

    Ok((sub.to_string(), DomainKey::parse(rest)?))
}

/// Reconciles desired (FQDN, target IP) bindings against one registrar.
///
/// Holds no state between calls: every reconcile fetches the record set
/// fresh, because the registrar is the sole source of truth.
pub struct Reconciler {
    registrar: Arc<dyn Registrar>,
}

impl Reconciler {
    /// Create a reconciler over a registrar backend
    pub fn new(registrar: Arc<dyn Registrar>) -> Self {
        Self { registrar }
    }

    /// Make the registrar's A-record for `fqdn` point at `target_ip`.
    ///
    /// Registrar errors propagate unchanged and abort the operation. A
    /// failed delta guard aborts before any submission is sent.
    pub async fn ensure_binding(&self, fqdn: &str, target_ip: IpAddr) -> Result<ReconcileOutcome> {
        let (sub, domain) = split_fqdn(fqdn)?;
        let target = target_ip.to_string();

        debug!(
            "reconciling {} -> {} via {}",
            fqdn,
            target,
            self.registrar.registrar_name()
        );

        let current = self.registrar.fetch_records(&domain).await?;

        let existing = current.iter().find(|record| record.is_a_for(&sub));

        match existing {
            Some(record) if record.address == target => {
                info!("{} already registered to {}", fqdn, record.address);
                Ok(ReconcileOutcome::Unchanged {
                    current_ip: record.address.clone(),
                })
            }
            Some(record) => {
                let previous_ip = record.address.clone();
                info!(
                    "{} registered to {} instead of {}, replacing",
                    fqdn, previous_ip, target
                );

                let kept: Vec<HostRecord> = current
                    .iter()
                    .filter(|record| !record.is_a_for(&sub))
                    .cloned()
                    .collect();

                // Refuse to submit a delete that would remove anything other
                // than exactly one record.
                if current.len() != kept.len() + 1 {
                    return Err(Error::UnexpectedDelta {
                        name: fqdn.to_string(),
                        before: current.len(),
                        after: kept.len(),
                    });
                }

                self.registrar.replace_records(&domain, &kept).await?;

                // Base the add on the freshly confirmed remote state rather
                // than the locally mutated copy.
                let mut refreshed = self.registrar.fetch_records(&domain).await?;
                refreshed.push(HostRecord::a_record(&sub, &target));
                self.registrar.replace_records(&domain, &refreshed).await?;

                info!("{} now registered to {}", fqdn, target);
                Ok(ReconcileOutcome::Replaced { previous_ip })
            }
            None => {
                let mut next = current;
                next.push(HostRecord::a_record(&sub, &target));
                self.registrar.replace_records(&domain, &next).await?;

                info!("{} now registered to {}", fqdn, target);
                Ok(ReconcileOutcome::Created)
            }
        }
    }
}
