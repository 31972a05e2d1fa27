//! Depositing the submission graph into the destination shape.
//!
//! One depth-first pass drives [`facet_reflect::Partial`] through the
//! destination: named children become struct fields or map entries, indexed
//! children become sequence elements (gaps zero-filled), leaves get their
//! payload coerced or assigned. Option, smart pointer and transparent
//! wrapper shapes are entered on the way down and closed on the way up.
//!
//! Failure policy: anything wrong with a single assignment (unknown field,
//! index on a non-sequence, payload/leaf mismatch, a value that won't
//! coerce) is logged at debug level and dropped, and the enclosing node is
//! still completed to its zero value. Only reflection errors that mean the
//! destination shape itself cannot be built (a field that is neither
//! submitted nor defaultable) abort the call.

use std::collections::BTreeMap;

use facet_core::{Characteristic, Def, FieldFlags, Shape, StructType, Type, UserType};
use facet_reflect::{Partial, ReflectError};
use log::{debug, trace};
use owo_colors::OwoColorize;

use crate::error::{BindError, BindErrorKind};
use crate::form::FilePart;
use crate::tree::{Node, RawValue};

/// Deposit one node into the current frame, leaving the frame fully
/// initialized whether or not every payload inside made it.
pub(crate) fn deposit<'facet>(
    wip: &mut Partial<'facet>,
    node: &Node<'_>,
) -> Result<(), ReflectError> {
    if matches!(node, Node::Empty) {
        // never addressed: zero value, and Option stays None
        if wip.shape().is(Characteristic::Default) {
            wip.set_default()?;
            return Ok(());
        }
        // no Default impl; go innermost and build the zero value piecewise
        let frames = enter_value(wip)?;
        zero_fill(wip)?;
        for _ in 0..frames {
            wip.end()?;
        }
        return Ok(());
    }

    let frames = enter_value(wip)?;
    deposit_innermost(wip, node)?;
    for _ in 0..frames {
        wip.end()?;
    }
    Ok(())
}

/// Zero one innermost frame whose shape has no `Default` impl: a struct is
/// completed field by field, anything else gets one last `set_default`
/// attempt so the reflection error names the shape that cannot be built.
fn zero_fill(wip: &mut Partial<'_>) -> Result<(), ReflectError> {
    let shape = wip.shape();
    if shape.is(Characteristic::Default) {
        wip.set_default()?;
    } else if let Type::User(UserType::Struct(sd)) = shape.ty {
        deposit_struct(wip, sd, &BTreeMap::new())?;
    } else {
        wip.set_default()?;
    }
    Ok(())
}

/// Whether a gap or unsubmitted node of this shape can be given a zero
/// value at all, directly or by recursing into it.
fn has_zero_value(shape: &'static Shape) -> bool {
    shape.is(Characteristic::Default)
        || matches!(shape.ty, Type::User(UserType::Struct(_)))
        || matches!(shape.def, Def::Pointer(_))
        || shape.inner.is_some()
}

/// Resolve the innermost value frame, entering Option / smart pointer /
/// transparent wrapper shapes. Returns how many frames were pushed.
fn enter_value(wip: &mut Partial<'_>) -> Result<usize, ReflectError> {
    let mut frames = 0usize;
    let mut smart_pointer_begun = false;
    loop {
        let shape = wip.shape();
        if matches!(shape.def, Def::Option(_)) {
            trace!("Entering Some(_) for {}", shape.blue());
            wip.begin_some()?;
            frames += 1;
        } else if matches!(shape.def, Def::Pointer(_)) {
            // a slice pointee keeps the same shape; don't loop on it
            if smart_pointer_begun {
                break;
            }
            trace!("Entering smart pointer for {}", shape.blue());
            wip.begin_smart_ptr()?;
            frames += 1;
            smart_pointer_begun = true;
        } else if shape.inner.is_some() {
            trace!("Entering wrapper for {}", shape.blue());
            wip.begin_inner()?;
            frames += 1;
        } else {
            break;
        }
    }
    Ok(frames)
}

fn deposit_innermost<'facet>(
    wip: &mut Partial<'facet>,
    node: &Node<'_>,
) -> Result<(), ReflectError> {
    let shape = wip.shape();
    match node {
        Node::Empty => zero_fill(wip),

        Node::Leaf(values) => {
            if let Err(err) = assign_leaf(wip, values) {
                debug!("Dropping assignment into {}: {err}", shape.blue());
                wip.set_default()?;
            }
            Ok(())
        }

        Node::Branch(children) => {
            if matches!(shape.def, Def::Map(_)) {
                return deposit_map(
                    wip,
                    children.iter().map(|(key, child)| (key.clone(), child)),
                );
            }
            match shape.ty {
                Type::User(UserType::Struct(sd)) => deposit_struct(wip, sd, children),
                _ => {
                    let err = BindError::new(BindErrorKind::TypeMismatch {
                        wanted: "a struct or map node",
                        shape,
                    });
                    debug!("Dropping subtree: {err}");
                    wip.set_default().map(|_| ())
                }
            }
        }

        Node::Items(items) => match shape.def {
            Def::List(_) => {
                wip.set_default()?;
                wip.begin_list()?;
                for (index, item) in items.iter().enumerate() {
                    trace!("List element [{index}] of {}", shape.blue());
                    wip.begin_list_item()?;
                    deposit(wip, item)?;
                    wip.end()?;
                }
                Ok(())
            }
            Def::Array(ad) => {
                for index in 0..ad.n {
                    wip.begin_nth_element(index)?;
                    deposit(wip, items.get(index).unwrap_or(&Node::Empty))?;
                    wip.end()?;
                }
                if items.len() > ad.n {
                    let err = BindError::new(BindErrorKind::IndexOnNonSequence {
                        index: items.len() - 1,
                        shape,
                    });
                    debug!("Dropping out-of-range array elements: {err}");
                }
                Ok(())
            }
            // an indexed step on a map uses the decimal index as the key
            Def::Map(_) => deposit_map(
                wip,
                items
                    .iter()
                    .enumerate()
                    .map(|(index, child)| (index.to_string(), child)),
            ),
            _ => {
                let err = BindError::new(BindErrorKind::IndexOnNonSequence {
                    index: items.len().saturating_sub(1),
                    shape,
                });
                debug!("Dropping subtree: {err}");
                wip.set_default().map(|_| ())
            }
        },
    }
}

fn deposit_struct<'facet>(
    wip: &mut Partial<'facet>,
    sd: StructType,
    children: &BTreeMap<String, Node<'_>>,
) -> Result<(), ReflectError> {
    let shape = wip.shape();
    for (name, child) in children {
        let Some(index) = wip.field_index(name) else {
            let err = BindError::new(BindErrorKind::FieldNotFound {
                field: name.clone(),
                shape,
            });
            debug!("Dropping subtree: {err}");
            continue;
        };
        trace!("Struct field {} of {}", name.green(), shape.blue());
        wip.begin_nth_field(index)?;
        deposit(wip, child)?;
        wip.end()?;
    }

    // every field the submission didn't reach gets its zero value
    for (index, field) in sd.fields.iter().enumerate() {
        if wip.is_field_set(index)? {
            continue;
        }
        trace!(
            "Field #{} {} was not submitted; setting default",
            index.yellow(),
            field.name.green()
        );
        wip.begin_nth_field(index)?;
        let field_default_fn = if field.flags.contains(FieldFlags::DEFAULT) {
            field.vtable.default_fn
        } else {
            None
        };
        if let Some(field_default_fn) = field_default_fn {
            wip.set_field_default(field_default_fn)?;
        } else if has_zero_value(field.shape()) {
            deposit(wip, &Node::Empty)?;
        } else {
            return Err(ReflectError::UninitializedField {
                shape,
                field_name: field.name,
            });
        }
        wip.end()?;
    }
    Ok(())
}

fn deposit_map<'facet, 'tree>(
    wip: &mut Partial<'facet>,
    entries: impl Iterator<Item = (String, &'tree Node<'tree>)>,
) -> Result<(), ReflectError> {
    let shape = wip.shape();
    let Def::Map(md) = shape.def else {
        unreachable!("deposit_map called on non-map shape");
    };
    if !md.k().is_type::<String>() {
        let err = BindError::new(BindErrorKind::TypeMismatch {
            wanted: "a string-keyed map",
            shape,
        });
        debug!("Dropping subtree: {err}");
        return wip.set_default().map(|_| ());
    }

    wip.begin_map()?;
    for (key, child) in entries {
        trace!("Map entry {} of {}", key.green(), shape.blue());
        wip.begin_key()?;
        wip.set(key)?;
        wip.end()?;
        wip.begin_value()?;
        deposit(wip, child)?;
        wip.end()?;
    }
    Ok(())
}

/// Assign a leaf's payloads into the current (already innermost) frame.
///
/// Multiple payloads on a scalar leaf follow the "last applied value wins"
/// rule: values are tried latest-first and the first that coerces is kept.
/// A sequence-typed leaf instead accumulates all payloads in submission
/// order. On error the frame is left untouched; the caller zero-fills it.
fn assign_leaf(wip: &mut Partial<'_>, values: &[RawValue<'_>]) -> Result<(), BindError> {
    let shape = wip.shape();

    if matches!(shape.def, Def::List(_)) && !shape.is_type::<Vec<u8>>() {
        wip.set_default().map_err(|e| reflect_soft(e, shape))?;
        wip.begin_list().map_err(|e| reflect_soft(e, shape))?;
        for value in values {
            wip.begin_list_item().map_err(|e| reflect_soft(e, shape))?;
            let element_shape = wip.shape();
            if let Err(err) = assign_single(wip, value) {
                debug!("Dropping element of {}: {err}", element_shape.blue());
                wip.set_default().map_err(|e| reflect_soft(e, shape))?;
            }
            wip.end().map_err(|e| reflect_soft(e, shape))?;
        }
        return Ok(());
    }

    let mut last_err = None;
    for value in values.iter().rev() {
        match assign_single(wip, value) {
            Ok(()) => return Ok(()),
            Err(err) => last_err = last_err.or(Some(err)),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        BindError::new(BindErrorKind::TypeMismatch {
            wanted: "at least one payload",
            shape,
        })
    }))
}

fn assign_single(wip: &mut Partial<'_>, value: &RawValue<'_>) -> Result<(), BindError> {
    let shape = wip.shape();
    match value {
        RawValue::Text(text) => assign_text(wip, text),
        RawValue::File(part) => {
            if shape.is_type::<FilePart>() {
                wip.set((*part).clone()).map_err(|e| reflect_soft(e, shape))?;
                Ok(())
            } else if shape.is_type::<Vec<u8>>() {
                // raw content, metadata dropped
                wip.set(part.bytes().to_vec())
                    .map_err(|e| reflect_soft(e, shape))?;
                Ok(())
            } else {
                Err(BindError::new(BindErrorKind::TypeMismatch {
                    wanted: "a file-handle leaf",
                    shape,
                }))
            }
        }
    }
}

/// The scalar coercer: convert one string payload into the current frame.
fn assign_text(wip: &mut Partial<'_>, text: &str) -> Result<(), BindError> {
    let shape = wip.shape();

    if let Type::User(UserType::Enum(_)) = shape.ty {
        return match wip.find_variant(text) {
            Some((index, variant)) if variant.data.fields.is_empty() => {
                wip.select_nth_variant(index)
                    .map_err(|e| reflect_soft(e, shape))?;
                Ok(())
            }
            _ => Err(coercion(text, shape)),
        };
    }

    if shape.is_type::<bool>() {
        wip.set(parse_bool(text)).map_err(|e| reflect_soft(e, shape))?;
        return Ok(());
    }

    if shape.is_type::<String>() {
        wip.set(text.to_string()).map_err(|e| reflect_soft(e, shape))?;
        return Ok(());
    }

    if matches!(shape.def, Def::Scalar) {
        return match wip.parse_from_str(text) {
            Ok(_) => Ok(()),
            Err(ReflectError::OperationFailed { operation, .. })
                if operation.contains("does not support parsing") =>
            {
                // string-backed scalar without a parse function
                wip.set(text.to_string()).map_err(|_| coercion(text, shape))?;
                Ok(())
            }
            Err(_) => Err(coercion(text, shape)),
        };
    }

    Err(BindError::new(BindErrorKind::TypeMismatch {
        wanted: "a scalar leaf",
        shape,
    }))
}

/// Boolean form literals. Checkboxes submit `on`, so the recognized true
/// set is `1`, `t`, `true`, `on` and `yes`, ASCII case-insensitive; every
/// other literal is false. This never fails.
fn parse_bool(text: &str) -> bool {
    matches!(
        text.to_ascii_lowercase().as_str(),
        "1" | "t" | "true" | "on" | "yes"
    )
}

fn coercion(text: &str, shape: &'static Shape) -> BindError {
    BindError::new(BindErrorKind::Coercion {
        value: text.to_string(),
        shape,
    })
}

fn reflect_soft(err: ReflectError, shape: &'static Shape) -> BindError {
    BindError::new(BindErrorKind::Coercion {
        value: format!("<reflect: {err}>"),
        shape,
    })
}
