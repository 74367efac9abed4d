use super::EditorError;
use crate::block::Block;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListDraft {
    items: Vec<String>,
}

impl Default for ListDraft {
    fn default() -> Self {
        Self {
            items: vec![String::new()],
        }
    }
}

impl ListDraft {
    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn add_item(&mut self) {
        self.items.push(String::new());
    }

    /// Refused when it would leave the list without items.
    pub fn remove_item(&mut self, index: usize) -> Result<String, EditorError> {
        let len = self.items.len();
        if index >= len {
            return Err(EditorError::IndexOutOfRange { index, len });
        }
        if len == 1 {
            return Err(EditorError::LastListItem);
        }
        Ok(self.items.remove(index))
    }

    pub fn update_item(&mut self, index: usize, value: impl Into<String>) -> Result<(), EditorError> {
        let len = self.items.len();
        let item = self
            .items
            .get_mut(index)
            .ok_or(EditorError::IndexOutOfRange { index, len })?;
        *item = value.into();
        Ok(())
    }

    /// Blank items are kept; they are hidden when rendered.
    pub(super) fn to_block(&self) -> Block {
        Block::List {
            items: self.items.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_drops_the_last_item() {
        let mut list = ListDraft::default();
        assert_eq!(list.remove_item(0), Err(EditorError::LastListItem));
        list.add_item();
        list.update_item(1, "b").unwrap();
        assert_eq!(list.remove_item(0), Ok(String::new()));
        assert_eq!(list.items(), ["b"]);
        assert_eq!(
            list.update_item(3, "x"),
            Err(EditorError::IndexOutOfRange { index: 3, len: 1 })
        );
    }
}
