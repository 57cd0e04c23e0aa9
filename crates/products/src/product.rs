use ordermgmt_core::{AggregateRoot, DomainError, DomainResult, Money, ProductId};

/// Aggregate root: Product (catalog entry + stock ledger).
///
/// `stock_quantity` only changes through [`Product::increase`] and
/// [`Product::decrease`]; it can never go below zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    name: String,
    description: String,
    price: Money,
    stock_quantity: u32,
    version: u64,
}

impl Product {
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        description: impl Into<String>,
        price: Money,
        stock_quantity: u32,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }

        Ok(Self {
            id,
            name,
            description: description.into(),
            price,
            stock_quantity,
            version: 0,
        })
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn stock_quantity(&self) -> u32 {
        self.stock_quantity
    }

    /// True iff the ledger currently holds at least `quantity` units.
    pub fn is_available(&self, quantity: u32) -> bool {
        self.stock_quantity >= quantity
    }

    /// Remove `quantity` units from the ledger.
    pub fn decrease(&mut self, quantity: u32) -> DomainResult<()> {
        ensure_positive(quantity)?;

        self.stock_quantity = self.stock_quantity.checked_sub(quantity).ok_or_else(|| {
            DomainError::InsufficientStock {
                product: self.name.clone(),
                requested: quantity,
                available: self.stock_quantity,
            }
        })?;
        Ok(())
    }

    /// Put `quantity` units back on the ledger (cancellations, returns).
    pub fn increase(&mut self, quantity: u32) -> DomainResult<()> {
        ensure_positive(quantity)?;

        self.stock_quantity = self
            .stock_quantity
            .checked_add(quantity)
            .ok_or_else(|| DomainError::validation("stock quantity overflowed"))?;
        Ok(())
    }

    /// Record the revision assigned by the store on commit.
    pub fn mark_persisted(&mut self, version: u64) {
        self.version = version;
    }
}

fn ensure_positive(quantity: u32) -> DomainResult<()> {
    if quantity == 0 {
        return Err(DomainError::validation("quantity must be positive"));
    }
    Ok(())
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> Option<&Self::Id> {
        Some(&self.id)
    }

    fn version(&self) -> u64 {
        self.version
    }
}
