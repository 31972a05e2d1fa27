#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

use facet_core::Facet;
use facet_reflect::Partial;
use log::{debug, trace};

mod deposit;
mod error;
mod form;
mod path;
mod route;
mod tree;

pub use error::{
    BindError, BindErrorKind, FormError, FormErrorKind, PathParseError, PathParseErrorKind,
};
pub use form::{FilePart, FormData};
pub use path::{PathSegment, parse_path};
pub use route::{ByNames, ByPrefix, KeyRoute};

use tree::{Node, RawValue};

/// Bind a form submission onto a value of type `T`, routing keys by prefix.
///
/// Keys starting with `prefix` participate; the remainder (after one `.`
/// separator, if present) is bound as a path into `T`. See [`ByPrefix`] for
/// the exact matching rule, and [`parse_path`] for the path syntax. The
/// empty prefix binds every key.
///
/// Keys that route to nothing, address unknown fields, or carry values that
/// won't coerce are logged at debug level and dropped; the rest of the
/// submission still binds. An error is returned only when `T` itself cannot
/// be built, e.g. a missing field with no default.
///
/// ```
/// use facet::Facet;
/// use facet_formdata::{FormData, from_form};
///
/// #[derive(Facet, Debug, PartialEq)]
/// struct Person {
///     name: String,
///     age: u32,
/// }
///
/// let form = FormData::from_urlencoded("p.name=Ada&p.age=36&csrf_token=ignored");
/// let person: Person = from_form(&form, "p").unwrap();
/// assert_eq!(
///     person,
///     Person {
///         name: "Ada".to_string(),
///         age: 36
///     }
/// );
/// ```
pub fn from_form<'facet, T: Facet<'facet>>(
    form: &FormData,
    prefix: &str,
) -> Result<T, FormError> {
    bind(form, &ByPrefix(prefix))
}

/// Alias of [`from_form`] for callers that want the routing policy spelled
/// out at the call site.
pub fn from_form_by_prefix<'facet, T: Facet<'facet>>(
    form: &FormData,
    prefix: &str,
) -> Result<T, FormError> {
    bind(form, &ByPrefix(prefix))
}

/// Bind a form submission onto a value of type `T`, accepting only keys
/// exactly equal to one of `names` (unchanged). See [`ByNames`].
pub fn from_form_by_names<'facet, T: Facet<'facet>>(
    form: &FormData,
    names: &[&str],
) -> Result<T, FormError> {
    bind(form, &ByNames(names))
}

/// Bind a form submission onto a value of type `T` with a caller-supplied
/// routing policy: any [`KeyRoute`] implementation, including plain
/// closures from raw key to optional routed key.
pub fn from_form_with<'facet, T: Facet<'facet>>(
    form: &FormData,
    route: impl KeyRoute,
) -> Result<T, FormError> {
    bind(form, &route)
}

/// The routine behind all entry points: fold the routed pairs into the
/// submission graph, then deposit the graph into a freshly allocated `T`.
fn bind<'facet, T: Facet<'facet>>(
    form: &FormData,
    route: &impl KeyRoute,
) -> Result<T, FormError> {
    let mut root = Node::Empty;
    for (key, values) in &form.values {
        fold_key(
            &mut root,
            route,
            key,
            values.iter().map(|value| RawValue::Text(value.as_str())),
        );
    }
    for (key, parts) in &form.files {
        fold_key(&mut root, route, key, parts.iter().map(RawValue::File));
    }

    let mut wip = Partial::alloc_shape(T::SHAPE)?;
    deposit::deposit(&mut wip, &root)?;
    let value = wip.build()?.materialize::<T>()?;
    trace!("Built a {}", T::SHAPE);
    Ok(value)
}

/// Route one raw key, parse it, and fold its payloads into the graph.
fn fold_key<'form>(
    root: &mut Node<'form>,
    route: &impl KeyRoute,
    raw: &str,
    values: impl Iterator<Item = RawValue<'form>>,
) {
    let Some(routed) = route.route(raw) else {
        trace!("Skipping unrouted key {raw:?}");
        return;
    };
    let segments = match parse_path(&routed) {
        Ok(segments) => segments,
        Err(err) => {
            let err = BindError::from(err);
            debug!("Dropping key {raw:?}: {err}");
            return;
        }
    };
    for value in values {
        if let Err(err) = tree::insert(root, &segments, value) {
            debug!("Dropping a value for key {raw:?}: {err}");
        }
    }
}
