//! In-memory store, the default backend and the reference for the port
//! semantics: tenant-keyed maps, version-checked saves, and a single write
//! lock around the winner swap.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::ProcurementError;
use crate::models::{
    PurchaseOrder, PurchaseRequisition, RequestForQuotation, Supplier, SupplierEvaluation,
    SupplierQuotation,
};
use crate::workflow::DocumentStatus;

use super::{
    DocumentFilter, EvaluationStore, Page, PageRequest, PurchaseOrderStore, QuotationStore,
    RequisitionStore, RfqStore, SupplierFilter, SupplierStore,
};

type Shelf<T> = RwLock<HashMap<(Uuid, Uuid), T>>;

/// Tokio-synchronized maps keyed by `(tenant_id, id)`, so a lookup from the
/// wrong tenant simply misses.
#[derive(Default)]
pub struct InMemoryStore {
    suppliers: Shelf<Supplier>,
    requisitions: Shelf<PurchaseRequisition>,
    rfqs: Shelf<RequestForQuotation>,
    quotations: Shelf<SupplierQuotation>,
    purchase_orders: Shelf<PurchaseOrder>,
    evaluations: Shelf<SupplierEvaluation>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Uniform access to the bookkeeping fields every stored record carries.
trait Record: Clone {
    const KIND: &'static str;
    fn id(&self) -> Uuid;
    fn tenant_id(&self) -> Uuid;
    fn version(&self) -> u64;
    fn set_version(&mut self, version: u64);
    fn created_at(&self) -> DateTime<Utc>;
}

/// Workflow documents additionally expose the fields the shared
/// [`DocumentFilter`] matches on.
trait DocumentRecord: Record {
    fn number(&self) -> &str;
    fn status(&self) -> DocumentStatus;
    fn supplier_ref(&self) -> Option<Uuid>;
    fn created_by(&self) -> &str;
}

macro_rules! impl_record {
    ($type:ty, $kind:expr) => {
        impl Record for $type {
            const KIND: &'static str = $kind;
            fn id(&self) -> Uuid {
                self.id
            }
            fn tenant_id(&self) -> Uuid {
                self.tenant_id
            }
            fn version(&self) -> u64 {
                self.version
            }
            fn set_version(&mut self, version: u64) {
                self.version = version;
            }
            fn created_at(&self) -> DateTime<Utc> {
                self.created_at
            }
        }
    };
}

macro_rules! impl_document_record {
    ($type:ty, $kind:expr, $supplier:expr) => {
        impl_record!($type, $kind);
        impl DocumentRecord for $type {
            fn number(&self) -> &str {
                &self.number
            }
            fn status(&self) -> DocumentStatus {
                <$type>::status(self)
            }
            fn supplier_ref(&self) -> Option<Uuid> {
                let pick: fn(&$type) -> Option<Uuid> = $supplier;
                pick(self)
            }
            fn created_by(&self) -> &str {
                &self.created_by
            }
        }
    };
}

impl_record!(Supplier, "supplier");
impl_document_record!(PurchaseRequisition, "requisition", |doc| doc
    .preferred_supplier_id);
impl_document_record!(RequestForQuotation, "rfq", |doc| doc.supplier_id);
impl_document_record!(SupplierQuotation, "quotation", |doc| Some(doc.supplier_id));
impl_document_record!(PurchaseOrder, "purchase order", |doc| Some(doc.supplier_id));
impl_document_record!(SupplierEvaluation, "supplier evaluation", |doc| Some(
    doc.supplier_id
));

async fn insert_record<T: Record>(shelf: &Shelf<T>, record: T) -> Result<T, ProcurementError> {
    let mut map = shelf.write().await;
    let key = (record.tenant_id(), record.id());
    if map.contains_key(&key) {
        return Err(ProcurementError::Conflict(format!(
            "{} {} already exists",
            T::KIND,
            record.id()
        )));
    }
    map.insert(key, record.clone());
    Ok(record)
}

async fn find_record<T: Record>(
    shelf: &Shelf<T>,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<T, ProcurementError> {
    shelf
        .read()
        .await
        .get(&(tenant_id, id))
        .cloned()
        .ok_or_else(|| ProcurementError::not_found(T::KIND, id))
}

fn check_and_bump<T: Record>(stored: &T, incoming: &mut T) -> Result<(), ProcurementError> {
    if stored.version() != incoming.version() {
        return Err(ProcurementError::ConcurrentModification(incoming.id()));
    }
    incoming.set_version(incoming.version() + 1);
    Ok(())
}

async fn save_record<T: Record>(shelf: &Shelf<T>, mut record: T) -> Result<T, ProcurementError> {
    let mut map = shelf.write().await;
    let key = (record.tenant_id(), record.id());
    let stored = map
        .get(&key)
        .ok_or_else(|| ProcurementError::not_found(T::KIND, record.id()))?;
    check_and_bump(stored, &mut record)?;
    map.insert(key, record.clone());
    Ok(record)
}

async fn number_taken<T: DocumentRecord>(
    shelf: &Shelf<T>,
    tenant_id: Uuid,
    number: &str,
) -> Result<bool, ProcurementError> {
    Ok(shelf
        .read()
        .await
        .values()
        .any(|record| record.tenant_id() == tenant_id && record.number() == number))
}

fn paginate<T>(mut matches: Vec<T>, page: PageRequest) -> Page<T>
where
    T: Record,
{
    matches.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    let total = matches.len() as u64;
    // Pages are 1-based; a literal page 0 reads as the first page.
    let start = (page.page.saturating_sub(1) * page.per_page) as usize;
    let items = matches
        .into_iter()
        .skip(start)
        .take(page.per_page as usize)
        .collect();
    Page {
        items,
        total,
        page: page.page,
        per_page: page.per_page,
    }
}

async fn list_documents<T: DocumentRecord>(
    shelf: &Shelf<T>,
    tenant_id: Uuid,
    filter: DocumentFilter,
    page: PageRequest,
) -> Result<Page<T>, ProcurementError> {
    let matches: Vec<T> = shelf
        .read()
        .await
        .values()
        .filter(|record| record.tenant_id() == tenant_id)
        .filter(|record| filter.status.map_or(true, |s| record.status() == s))
        .filter(|record| {
            filter
                .supplier_id
                .map_or(true, |id| record.supplier_ref() == Some(id))
        })
        .filter(|record| {
            filter
                .created_by
                .as_deref()
                .map_or(true, |by| record.created_by() == by)
        })
        .cloned()
        .collect();
    Ok(paginate(matches, page))
}

#[async_trait]
impl SupplierStore for InMemoryStore {
    async fn insert(&self, supplier: Supplier) -> Result<Supplier, ProcurementError> {
        insert_record(&self.suppliers, supplier).await
    }

    async fn find(&self, tenant_id: Uuid, id: Uuid) -> Result<Supplier, ProcurementError> {
        find_record(&self.suppliers, tenant_id, id).await
    }

    async fn save(&self, supplier: Supplier) -> Result<Supplier, ProcurementError> {
        save_record(&self.suppliers, supplier).await
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        filter: SupplierFilter,
        page: PageRequest,
    ) -> Result<Page<Supplier>, ProcurementError> {
        let needle = filter.search.as_deref().map(str::to_lowercase);
        let matches: Vec<Supplier> = self
            .suppliers
            .read()
            .await
            .values()
            .filter(|s| s.tenant_id == tenant_id)
            .filter(|s| filter.status.map_or(true, |status| s.status() == status))
            .filter(|s| {
                needle.as_deref().map_or(true, |needle| {
                    s.name.to_lowercase().contains(needle)
                        || s.code.to_lowercase().contains(needle)
                })
            })
            .cloned()
            .collect();
        Ok(paginate(matches, page))
    }

    async fn code_taken(
        &self,
        tenant_id: Uuid,
        code: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, ProcurementError> {
        Ok(self.suppliers.read().await.values().any(|s| {
            s.tenant_id == tenant_id && s.code.eq_ignore_ascii_case(code) && Some(s.id) != exclude
        }))
    }

    async fn email_taken(
        &self,
        tenant_id: Uuid,
        email: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, ProcurementError> {
        Ok(self.suppliers.read().await.values().any(|s| {
            s.tenant_id == tenant_id && s.email.eq_ignore_ascii_case(email) && Some(s.id) != exclude
        }))
    }
}

#[async_trait]
impl RequisitionStore for InMemoryStore {
    async fn insert(
        &self,
        requisition: PurchaseRequisition,
    ) -> Result<PurchaseRequisition, ProcurementError> {
        insert_record(&self.requisitions, requisition).await
    }

    async fn find(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<PurchaseRequisition, ProcurementError> {
        find_record(&self.requisitions, tenant_id, id).await
    }

    async fn save(
        &self,
        requisition: PurchaseRequisition,
    ) -> Result<PurchaseRequisition, ProcurementError> {
        save_record(&self.requisitions, requisition).await
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        filter: DocumentFilter,
        page: PageRequest,
    ) -> Result<Page<PurchaseRequisition>, ProcurementError> {
        list_documents(&self.requisitions, tenant_id, filter, page).await
    }

    async fn number_taken(&self, tenant_id: Uuid, number: &str) -> Result<bool, ProcurementError> {
        number_taken(&self.requisitions, tenant_id, number).await
    }
}

#[async_trait]
impl RfqStore for InMemoryStore {
    async fn insert(
        &self,
        rfq: RequestForQuotation,
    ) -> Result<RequestForQuotation, ProcurementError> {
        insert_record(&self.rfqs, rfq).await
    }

    async fn find(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<RequestForQuotation, ProcurementError> {
        find_record(&self.rfqs, tenant_id, id).await
    }

    async fn save(
        &self,
        rfq: RequestForQuotation,
    ) -> Result<RequestForQuotation, ProcurementError> {
        save_record(&self.rfqs, rfq).await
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        filter: DocumentFilter,
        page: PageRequest,
    ) -> Result<Page<RequestForQuotation>, ProcurementError> {
        list_documents(&self.rfqs, tenant_id, filter, page).await
    }

    async fn number_taken(&self, tenant_id: Uuid, number: &str) -> Result<bool, ProcurementError> {
        number_taken(&self.rfqs, tenant_id, number).await
    }
}

#[async_trait]
impl QuotationStore for InMemoryStore {
    async fn insert(
        &self,
        quotation: SupplierQuotation,
    ) -> Result<SupplierQuotation, ProcurementError> {
        insert_record(&self.quotations, quotation).await
    }

    async fn find(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<SupplierQuotation, ProcurementError> {
        find_record(&self.quotations, tenant_id, id).await
    }

    async fn save(
        &self,
        quotation: SupplierQuotation,
    ) -> Result<SupplierQuotation, ProcurementError> {
        save_record(&self.quotations, quotation).await
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        filter: DocumentFilter,
        page: PageRequest,
    ) -> Result<Page<SupplierQuotation>, ProcurementError> {
        list_documents(&self.quotations, tenant_id, filter, page).await
    }

    async fn number_taken(&self, tenant_id: Uuid, number: &str) -> Result<bool, ProcurementError> {
        number_taken(&self.quotations, tenant_id, number).await
    }

    async fn find_by_rfq(
        &self,
        tenant_id: Uuid,
        rfq_id: Uuid,
    ) -> Result<Vec<SupplierQuotation>, ProcurementError> {
        let mut matches: Vec<SupplierQuotation> = self
            .quotations
            .read()
            .await
            .values()
            .filter(|q| q.tenant_id == tenant_id && q.rfq_id == rfq_id)
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matches)
    }

    async fn save_winner(
        &self,
        mut winner: SupplierQuotation,
    ) -> Result<SupplierQuotation, ProcurementError> {
        // One write lock covers the save and the demotion of any previous
        // winner, so the single-winner invariant holds at every observable
        // point.
        let mut map = self.quotations.write().await;
        let key = (winner.tenant_id, winner.id);
        let stored = map
            .get(&key)
            .ok_or_else(|| ProcurementError::not_found("quotation", winner.id))?;
        check_and_bump(stored, &mut winner)?;
        for (&(tenant, id), other) in map.iter_mut() {
            if tenant == winner.tenant_id
                && id != winner.id
                && other.rfq_id == winner.rfq_id
                && other.is_selected()
            {
                other.clear_selection();
                other.version += 1;
            }
        }
        map.insert(key, winner.clone());
        Ok(winner)
    }
}

#[async_trait]
impl PurchaseOrderStore for InMemoryStore {
    async fn insert(&self, order: PurchaseOrder) -> Result<PurchaseOrder, ProcurementError> {
        insert_record(&self.purchase_orders, order).await
    }

    async fn find(&self, tenant_id: Uuid, id: Uuid) -> Result<PurchaseOrder, ProcurementError> {
        find_record(&self.purchase_orders, tenant_id, id).await
    }

    async fn save(&self, order: PurchaseOrder) -> Result<PurchaseOrder, ProcurementError> {
        save_record(&self.purchase_orders, order).await
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        filter: DocumentFilter,
        page: PageRequest,
    ) -> Result<Page<PurchaseOrder>, ProcurementError> {
        list_documents(&self.purchase_orders, tenant_id, filter, page).await
    }

    async fn number_taken(&self, tenant_id: Uuid, number: &str) -> Result<bool, ProcurementError> {
        number_taken(&self.purchase_orders, tenant_id, number).await
    }
}

#[async_trait]
impl EvaluationStore for InMemoryStore {
    async fn insert(
        &self,
        evaluation: SupplierEvaluation,
    ) -> Result<SupplierEvaluation, ProcurementError> {
        insert_record(&self.evaluations, evaluation).await
    }

    async fn find(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<SupplierEvaluation, ProcurementError> {
        find_record(&self.evaluations, tenant_id, id).await
    }

    async fn save(
        &self,
        evaluation: SupplierEvaluation,
    ) -> Result<SupplierEvaluation, ProcurementError> {
        save_record(&self.evaluations, evaluation).await
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        filter: DocumentFilter,
        page: PageRequest,
    ) -> Result<Page<SupplierEvaluation>, ProcurementError> {
        list_documents(&self.evaluations, tenant_id, filter, page).await
    }

    async fn number_taken(&self, tenant_id: Uuid, number: &str) -> Result<bool, ProcurementError> {
        number_taken(&self.evaluations, tenant_id, number).await
    }
}
