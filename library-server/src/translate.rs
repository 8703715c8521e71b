//! Storage error -> domain error translation
//!
//! Pure mapping. Callers roll back before translating; nothing here touches
//! a transaction.

use library_core::{to_wire_casing, DomainError, ResourceSchema};

use crate::db::DbError;

pub fn translate(schema: &ResourceSchema, err: &DbError) -> DomainError {
    if err.is_foreign_key_violation() {
        return DomainError::integrity(parent_message(schema, err.constraint.as_deref()));
    }
    DomainError::persistence(err.message.clone())
}

fn parent_message(schema: &ResourceSchema, constraint: Option<&str>) -> String {
    if let Some(parent) = constraint.and_then(|c| schema.parent_for_constraint(c)) {
        return format!(
            "parent key not found: referenced {} does not exist ({})",
            parent.resource,
            to_wire_casing(parent.column)
        );
    }

    let columns: Vec<String> = schema.parents.iter().map(|p| to_wire_casing(p.column)).collect();
    if columns.is_empty() {
        "parent key not found".to_owned()
    } else {
        format!("parent key not found: ensure {} exist", columns.join(" and "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use library_core::schema::{BOOKS, BORROWS};
    use library_core::DomainErrorKind;

    #[test]
    fn fk_violation_names_the_parent() {
        let err = DbError::new("insert or update violates foreign key constraint")
            .with_code("23503")
            .with_constraint("library_api_borrows_member_id_fkey");
        let domain = translate(&BORROWS, &err);
        assert_eq!(domain.kind(), DomainErrorKind::IntegrityViolation);
        assert!(domain.to_string().contains("referenced member does not exist"));
    }

    #[test]
    fn fk_violation_without_constraint_lists_parents() {
        let err = DbError::new("fk").with_code("23503");
        let domain = translate(&BORROWS, &err);
        assert_eq!(domain.kind(), DomainErrorKind::IntegrityViolation);
        assert!(domain.to_string().contains("bookId and memberId"));
    }

    #[test]
    fn other_errors_are_persistence_failures() {
        let err = DbError::new("duplicate key value violates unique constraint").with_code("23505");
        let domain = translate(&BOOKS, &err);
        assert_eq!(domain.kind(), DomainErrorKind::PersistenceFailure);
        assert!(domain.to_string().contains("duplicate key value"));
    }
}
