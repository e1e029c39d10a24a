use oxidize_pmml_core::{PmmlError, PmmlResult};

/// A stack that refuses to grow past a fixed depth.
///
/// Derived-field and function evaluation push onto one of these instead of
/// relying on the native call stack alone, so runaway recursion in a model
/// fails with [`PmmlError::RecursionDepthExceeded`].
#[derive(Debug, Clone)]
pub struct BoundedStack<T> {
    items: Vec<T>,
    limit: usize,
}

impl<T> BoundedStack<T> {
    pub fn new(limit: usize) -> Self {
        BoundedStack { items: Vec::new(), limit }
    }

    /// Push `item`; `name` identifies it in the depth error.
    pub fn push(&mut self, item: T, name: &str) -> PmmlResult<()> {
        if self.items.len() >= self.limit {
            return Err(PmmlError::RecursionDepthExceeded {
                name: name.to_string(),
                depth: self.limit,
            });
        }
        self.items.push(item);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl<T: PartialEq> BoundedStack<T> {
    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }
}
