//! Transaction tags
//!
//! Optimistic locking stamps each enrolled element's `dirty` property with a
//! random tag before it is written. Commit strips the tag from everything in
//! the database carrying it. Rollback drops whatever was created under the
//! tag and strips it from elements that existed before.

use tracing::{debug, warn};
use uuid::Uuid;

use crate::client::{GraphClient, RawResult, Traversal};
use crate::element::ElementRef;
use crate::error::OgmResult;
use crate::graph::{ElementRole, LockingMode, PropertyValue};
use crate::schema::DIRTY;

/// Side-effect key used to collect tagged elements
const TAGGED: &str = "x";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Nothing enrolled yet
    Untagged,
    Tagged,
    Committed,
    RolledBack,
}

#[derive(Debug, Clone)]
struct Enrolled {
    element: ElementRef,
    /// Database id the element had when it was enrolled
    prior_id: Option<PropertyValue>,
}

/// One tag window
#[derive(Debug)]
pub struct Transaction {
    tag: String,
    state: TransactionState,
    enrolled: Vec<Enrolled>,
}

impl Transaction {
    pub fn new() -> Self {
        Self {
            tag: Uuid::new_v4().to_string(),
            state: TransactionState::Untagged,
            enrolled: Vec::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Stamp `element` with this tag when its schema uses optimistic locking.
    /// Returns whether the element was enrolled.
    pub fn enroll(&mut self, element: &ElementRef) -> bool {
        if element.schema().locking() != LockingMode::OptimisticLocking {
            return false;
        }
        element.set_dirty(Some(self.tag.clone()));
        self.enrolled.push(Enrolled {
            element: element.clone(),
            prior_id: element.id(),
        });
        self.state = TransactionState::Tagged;
        true
    }

    /// `E().has(dirty, tag).aggregate(x).fold().V().has(dirty, tag).aggregate(x)`
    fn tagged(&self) -> Traversal {
        Traversal::new()
            .e_all()
            .has(DIRTY, self.tag.as_str())
            .aggregate(TAGGED)
            .fold()
            .v_all()
            .has(DIRTY, self.tag.as_str())
            .aggregate(TAGGED)
    }

    fn tagged_elements(&self) -> Traversal {
        self.tagged().fold().select(TAGGED).unfold()
    }

    /// Strip the tag from every element carrying it
    pub async fn commit(&mut self, client: &dyn GraphClient) -> OgmResult<()> {
        if self.state == TransactionState::Tagged {
            client
                .iterate(&self.tagged_elements().properties([DIRTY]).drop())
                .await?;
            debug!("Committed transaction {}", self.tag);
        }
        self.clear_in_memory();
        self.state = TransactionState::Committed;
        Ok(())
    }

    /// Commit when `conflict_check` yields a result for any tagged vertex or
    /// edge, roll back otherwise.
    ///
    /// Returns the elements discarded by a rollback.
    pub async fn resolve(
        &mut self,
        client: &dyn GraphClient,
        conflict_check: &Traversal,
    ) -> OgmResult<Vec<ElementRef>> {
        if self.state != TransactionState::Tagged {
            self.state = TransactionState::Committed;
            return Ok(Vec::new());
        }
        let strip = Traversal::new()
            .select(TAGGED)
            .unfold()
            .properties([DIRTY])
            .drop();
        client
            .iterate(&self.tagged_elements().choose(conflict_check.clone(), strip))
            .await?;

        if self.still_tagged(client).await? {
            warn!("Conflict check failed for transaction {}", self.tag);
            return self.rollback(client).await;
        }
        debug!("Committed transaction {} after conflict check", self.tag);
        self.clear_in_memory();
        self.state = TransactionState::Committed;
        Ok(Vec::new())
    }

    async fn still_tagged(&self, client: &dyn GraphClient) -> OgmResult<bool> {
        let count = client
            .next(&self.tagged_elements().count())
            .await?;
        Ok(matches!(
            count,
            Some(RawResult::Value(ref n)) if n.as_i64().unwrap_or(0) > 0
        ))
    }

    /// Undo the tag window.
    ///
    /// Elements that existed before enrolment keep their data and lose the
    /// tag; everything still tagged afterwards was created in this window and
    /// is dropped. Returns the discarded elements, whose ids are cleared. An
    /// element whose database copy is gone after the rollback is discarded
    /// too.
    pub async fn rollback(&mut self, client: &dyn GraphClient) -> OgmResult<Vec<ElementRef>> {
        if self.state == TransactionState::Untagged {
            self.state = TransactionState::RolledBack;
            return Ok(Vec::new());
        }
        for enrolled in &self.enrolled {
            let Some(id) = &enrolled.prior_id else {
                continue;
            };
            let source = lookup(&enrolled.element, id.clone());
            client.iterate(&source.properties([DIRTY]).drop()).await?;
        }
        client.iterate(&self.tagged_elements().drop()).await?;
        debug!("Rolled back transaction {}", self.tag);

        let mut discarded = Vec::new();
        for enrolled in &self.enrolled {
            let gone = match (&enrolled.prior_id, enrolled.element.id()) {
                (Some(_), Some(id)) => client
                    .next(&lookup(&enrolled.element, id))
                    .await?
                    .is_none(),
                _ => true,
            };
            if gone {
                enrolled.element.clear_id();
                discarded.push(enrolled.element.clone());
            }
        }
        self.clear_in_memory();
        self.state = TransactionState::RolledBack;
        Ok(discarded)
    }

    fn clear_in_memory(&self) {
        for enrolled in &self.enrolled {
            enrolled.element.set_dirty(None);
        }
    }
}

fn lookup(element: &ElementRef, id: PropertyValue) -> Traversal {
    match element.role() {
        ElementRole::Edge => Traversal::new().e(id),
        _ => Traversal::new().v(id),
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}
