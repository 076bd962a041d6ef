//! Oneof group collection.

use crate::descriptor::{FieldDescriptor, FieldKind, MessageDescriptor};
use crate::error::CompileError;

/// One oneof group of a message, members in field declaration order.
#[derive(Debug, Clone)]
pub struct OneofGroup<'a> {
    pub name: &'a str,
    pub index: usize,
    pub description: Option<&'a str>,
    pub owner: &'a MessageDescriptor,
    pub members: Vec<&'a FieldDescriptor>,
}

/// Collect `message`'s oneof groups in declaration order.
///
/// Every member must be a message reference. All violations are reported,
/// not only the first.
pub fn collect_groups(message: &MessageDescriptor) -> Result<Vec<OneofGroup<'_>>, Vec<CompileError>> {
    let mut groups: Vec<OneofGroup<'_>> = message
        .oneofs
        .iter()
        .enumerate()
        .map(|(index, decl)| OneofGroup {
            name: &decl.name,
            index,
            description: decl.description.as_deref(),
            owner: message,
            members: Vec::new(),
        })
        .collect();

    let mut errors = Vec::new();
    let invalid = |group: &str, field: &str, reason: String| CompileError::InvalidOneofMember {
        message: message.full_name(),
        group: group.to_string(),
        field: field.to_string(),
        reason,
    };

    for field in &message.fields {
        let Some(index) = field.oneof_index else {
            continue;
        };
        let Some(group) = groups.get_mut(index) else {
            errors.push(invalid(
                &format!("#{index}"),
                &field.name,
                "no oneof declared at this index".to_string(),
            ));
            continue;
        };
        if field.kind != FieldKind::Message {
            errors.push(invalid(
                group.name,
                &field.name,
                format!("kind `{}` is not a message reference", field.kind),
            ));
            continue;
        }
        if field.repeated {
            errors.push(invalid(group.name, &field.name, "member is repeated".to_string()));
            continue;
        }
        group.members.push(field);
    }

    for group in &groups {
        let already_reported = errors.iter().any(|e| {
            matches!(e, CompileError::InvalidOneofMember { group: g, .. } if g == group.name)
        });
        if group.members.is_empty() && !already_reported {
            errors.push(invalid(group.name, "", "group has no members".to_string()));
        }
    }

    if errors.is_empty() {
        Ok(groups)
    } else {
        Err(errors)
    }
}
