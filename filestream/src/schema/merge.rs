use super::Schema;

/// Combines two schemas into one.
///
/// Fields present in only one operand are copied unchanged. Fields present in
/// both get the union of their type tags, collapsed back to a bare tag when
/// only one distinct tag remains. No field is dropped and no numeric coercion
/// happens, so the merge is commutative, associative and idempotent.
///
/// `object` and `array` are merged as opaque tags. Deep merging of nested
/// structures would have to happen here, on the field type, and is not
/// performed.
pub fn merge_schemas(a: Schema, b: Schema) -> Schema {
    let mut merged = a.into_fields();

    for (name, field_type) in b.into_fields() {
        match merged.get_mut(&name) {
            Some(existing) => {
                if *existing != field_type {
                    *existing = existing.union(&field_type);
                }
            }
            None => {
                merged.insert(name, field_type);
            }
        }
    }

    Schema::from_fields(merged)
}
