//! Converter assembly from field plans and variant sets
//!
//! This module is where a type's declared shape becomes a working
//! [`Converter`]. Three assembly surfaces are provided, one per shape:
//!
//! - [`ProductBuilder`] for records with named fields, combining an ordered
//!   field plan with a construct closure (object view in, value out) and a
//!   deconstruct closure (value in, emitted fields out);
//! - [`SumBuilder`] for closed sums, combining one [`VariantArm`] per
//!   alternative with a select closure that dispatches a value to its arm;
//! - [`singleton`] for zero-field types with a unique instance.
//!
//! The `#[derive(TreeCodec)]` macro generates calls into exactly these
//! builders; they are public so codecs can equally be registered by hand,
//! and every plan invariant (key uniqueness, variadic placement, reserved
//! keys, presence of both closures) is re-checked here at `finish` time
//! rather than trusted to the caller.
//!
//! # Discriminant tagging
//!
//! A sum value is serialized as the object produced by its variant's fields,
//! with one reserved entry [`TAG_KEY`] (`"$type"`) injected in first
//! position, holding the variant's tag string verbatim. Readers require the
//! tag entry, match it exactly against the known arms, and hand the same
//! object to the matching arm's reader; no prefix or fuzzy matching is
//! performed. Field plans may not use the reserved key, which keeps the
//! scheme unambiguous for arbitrary tag strings.

use crate::conv::error::{ReadError, ReadResult};
use crate::conv::Converter;
use crate::error::{DeriveError, DeriveResult};
use crate::tree::Tree;
use std::borrow::Cow;

/// The reserved object key under which a sum's discriminant tag is stored.
pub const TAG_KEY: &str = "$type";

/// One entry of a product's field plan: the original field name, the
/// serialized key it maps to, and the default/variadic markers that steer
/// both conversion directions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldMeta {
    original: Cow<'static, str>,
    key: Cow<'static, str>,
    has_default: bool,
    variadic: bool,
}

impl FieldMeta {
    /// A plan entry whose serialized key is the field's own name.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        let original = name.into();
        FieldMeta {
            key: original.clone(),
            original,
            has_default: false,
            variadic: false,
        }
    }

    /// Overrides the serialized key, as an explicit rename does.
    pub fn rename(mut self, key: impl Into<Cow<'static, str>>) -> Self {
        self.key = key.into();
        self
    }

    /// Marks the field as carrying a default value: absent on read means
    /// "use the default", equal-to-default on write means "omit the key".
    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    /// Marks the field as the trailing variable-arity field.
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn has_default(&self) -> bool {
        self.has_default
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic
    }
}

/// Write-side accumulator for one object's emitted fields.
///
/// Entries come out in `put` order, which derived deconstructors call in
/// field-plan order.
#[derive(Debug, Default)]
pub struct Record {
    entries: Vec<(String, Tree)>,
}

impl Record {
    pub fn new() -> Self {
        Record::default()
    }

    pub fn put(&mut self, key: impl Into<String>, value: Tree) {
        self.entries.push((key.into(), value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn into_object(self) -> Tree {
        Tree::Object(self.entries)
    }
}

/// Read-side view over one object's entries, with typed extraction helpers
/// that produce fully-contextualized errors.
pub struct Fields<'a> {
    ty: &'static str,
    entries: &'a [(String, Tree)],
}

impl<'a> Fields<'a> {
    /// The raw node under `key`, if present (first occurrence).
    pub fn get(&self, key: &str) -> Option<&'a Tree> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Extracts a field with no default: absent keys are an error.
    pub fn required<F>(&self, key: &str, conv: &Converter<F>) -> ReadResult<F> {
        match self.get(key) {
            Some(node) => self.decode(key, node, conv),
            None => Err(ReadError::MissingField {
                ty: self.ty,
                field: key.to_owned(),
            }),
        }
    }

    /// Extracts a field with a default: absent keys yield `fallback()`.
    pub fn defaulted<F>(
        &self,
        key: &str,
        conv: &Converter<F>,
        fallback: impl FnOnce() -> F,
    ) -> ReadResult<F> {
        match self.get(key) {
            Some(node) => self.decode(key, node, conv),
            None => Ok(fallback()),
        }
    }

    /// Extracts a trailing variadic field: one array node under one key,
    /// decoded element-wise. Absent keys are an error, matching a variadic
    /// field with no default annotation.
    pub fn variadic<F>(&self, key: &str, conv: &Converter<F>) -> ReadResult<Vec<F>> {
        match self.get(key) {
            Some(node) => self.elements(key, node, conv),
            None => Err(ReadError::MissingField {
                ty: self.ty,
                field: key.to_owned(),
            }),
        }
    }

    /// Variadic extraction for a field that also carries a default: an
    /// absent key yields the empty sequence.
    pub fn variadic_or_empty<F>(&self, key: &str, conv: &Converter<F>) -> ReadResult<Vec<F>> {
        match self.get(key) {
            Some(node) => self.elements(key, node, conv),
            None => Ok(Vec::new()),
        }
    }

    fn decode<F>(&self, key: &str, node: &Tree, conv: &Converter<F>) -> ReadResult<F> {
        conv.read(node).map_err(|cause| ReadError::FieldType {
            ty: self.ty,
            field: key.to_owned(),
            cause: Box::new(cause),
        })
    }

    fn elements<F>(&self, key: &str, node: &Tree, conv: &Converter<F>) -> ReadResult<Vec<F>> {
        let items = match node {
            Tree::Array(items) => items,
            other => {
                return Err(ReadError::FieldType {
                    ty: self.ty,
                    field: key.to_owned(),
                    cause: Box::new(ReadError::Mismatch {
                        expected: "array",
                        found: other.kind(),
                    }),
                })
            }
        };
        items
            .iter()
            .map(|item| self.decode(key, item, conv))
            .collect()
    }
}

/// Serializes a variadic field's elements as one array node.
pub fn write_seq<F>(items: &[F], conv: &Converter<F>) -> Tree {
    Tree::Array(items.iter().map(|item| conv.write(item)).collect())
}

type ReadFieldsFn<T> = Box<dyn Fn(&Fields<'_>) -> ReadResult<T>>;
type WriteFieldsFn<T> = Box<dyn Fn(&T, &mut Record)>;
type SelectFn<T> = Box<dyn Fn(&T, &mut Record) -> usize>;

/// Assembles the converter for a product type from its field plan and its
/// construct/deconstruct pair.
pub struct ProductBuilder<T> {
    ty: &'static str,
    fields: Vec<FieldMeta>,
    construct: Option<ReadFieldsFn<T>>,
    deconstruct: Option<WriteFieldsFn<T>>,
}

impl<T: 'static> ProductBuilder<T> {
    pub fn new(ty: &'static str) -> Self {
        ProductBuilder {
            ty,
            fields: Vec::new(),
            construct: None,
            deconstruct: None,
        }
    }

    /// Appends one entry to the field plan; call order is plan order.
    pub fn field(mut self, meta: FieldMeta) -> Self {
        self.fields.push(meta);
        self
    }

    /// Supplies the read-side constructor: ordered typed extraction from the
    /// object view, then application of the type's own constructor.
    pub fn construct(mut self, f: impl Fn(&Fields<'_>) -> ReadResult<T> + 'static) -> Self {
        self.construct = Some(Box::new(f));
        self
    }

    /// Supplies the write-side deconstructor, which emits each field it
    /// wants serialized into the record, in plan order.
    pub fn deconstruct(mut self, f: impl Fn(&T, &mut Record) + 'static) -> Self {
        self.deconstruct = Some(Box::new(f));
        self
    }

    /// Validates the plan and closes it into a converter.
    pub fn finish(self) -> DeriveResult<Converter<T>> {
        check_plan(self.ty, &self.fields)?;
        let ty = self.ty;
        let construct = self
            .construct
            .ok_or(DeriveError::NoConstructor { ty })?;
        let deconstruct = self
            .deconstruct
            .ok_or(DeriveError::NoDeconstructor { ty })?;
        Ok(Converter::from_fns(
            move |tree| match tree {
                Tree::Object(entries) => construct(&Fields { ty, entries }),
                other => Err(ReadError::ExpectedObject {
                    ty,
                    found: other.kind(),
                }),
            },
            move |value| {
                let mut rec = Record::new();
                deconstruct(value, &mut rec);
                rec.into_object()
            },
        ))
    }
}

/// The converter for a zero-field type with a unique instance.
///
/// Writes emit the empty object; reads accept any well-formed node and
/// yield the instance, since there is no field content to inspect. Inside a
/// sum, singletons are represented as unit [`VariantArm`]s instead, so the
/// discriminant tag still applies.
pub fn singleton<T: 'static>(make: impl Fn() -> T + 'static) -> Converter<T> {
    Converter::from_fns(move |_| Ok(make()), |_| Tree::Object(Vec::new()))
}

/// One alternative of a sum: its tag string, its field plan, and a reader
/// producing the sum type from the variant's serialized fields.
pub struct VariantArm<T> {
    tag: Cow<'static, str>,
    fields: Vec<FieldMeta>,
    read: ReadFieldsFn<T>,
}

impl<T> VariantArm<T> {
    pub fn new(
        tag: impl Into<Cow<'static, str>>,
        fields: Vec<FieldMeta>,
        read: impl Fn(&Fields<'_>) -> ReadResult<T> + 'static,
    ) -> Self {
        VariantArm {
            tag: tag.into(),
            fields,
            read: Box::new(read),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

/// Assembles the converter for a closed sum type from its variant arms and
/// a select function.
pub struct SumBuilder<T> {
    ty: &'static str,
    arms: Vec<VariantArm<T>>,
    select: Option<SelectFn<T>>,
}

impl<T: 'static> SumBuilder<T> {
    pub fn new(ty: &'static str) -> Self {
        SumBuilder {
            ty,
            arms: Vec::new(),
            select: None,
        }
    }

    /// Appends one alternative; call order determines arm indices.
    pub fn variant(mut self, arm: VariantArm<T>) -> Self {
        self.arms.push(arm);
        self
    }

    /// Supplies the write-side dispatcher: it emits the value's fields into
    /// the record and returns the index of the arm the value belongs to.
    pub fn select(mut self, f: impl Fn(&T, &mut Record) -> usize + 'static) -> Self {
        self.select = Some(Box::new(f));
        self
    }

    /// Validates every arm's plan and tag, then closes the sum into a
    /// converter that injects and dispatches on the discriminant.
    pub fn finish(self) -> DeriveResult<Converter<T>> {
        let ty = self.ty;
        if self.arms.is_empty() {
            return Err(DeriveError::NoVariants { ty });
        }
        for (i, arm) in self.arms.iter().enumerate() {
            check_plan(ty, &arm.fields)?;
            if self.arms[..i].iter().any(|prior| prior.tag == arm.tag) {
                return Err(DeriveError::DuplicateKey {
                    ty,
                    key: arm.tag.clone().into_owned(),
                });
            }
        }
        let select = self.select.ok_or(DeriveError::NoDeconstructor { ty })?;
        let tags: Vec<Cow<'static, str>> = self.arms.iter().map(|arm| arm.tag.clone()).collect();
        let arms = self.arms;
        Ok(Converter::from_fns(
            move |tree| {
                let entries = match tree {
                    Tree::Object(entries) => entries,
                    other => {
                        return Err(ReadError::ExpectedObject {
                            ty,
                            found: other.kind(),
                        })
                    }
                };
                let tag_node = entries
                    .iter()
                    .find(|(k, _)| k == TAG_KEY)
                    .map(|(_, v)| v)
                    .ok_or_else(|| ReadError::MissingField {
                        ty,
                        field: TAG_KEY.to_owned(),
                    })?;
                let tag = match tag_node {
                    Tree::String(tag) => tag,
                    other => {
                        return Err(ReadError::FieldType {
                            ty,
                            field: TAG_KEY.to_owned(),
                            cause: Box::new(ReadError::Mismatch {
                                expected: "string",
                                found: other.kind(),
                            }),
                        })
                    }
                };
                match arms.iter().find(|arm| arm.tag == *tag) {
                    Some(arm) => (arm.read)(&Fields { ty, entries }),
                    None => Err(ReadError::UnknownVariant {
                        ty,
                        tag: tag.clone(),
                    }),
                }
            },
            move |value| {
                let mut rec = Record::new();
                let idx = select(value, &mut rec);
                let mut entries = Vec::with_capacity(rec.entries.len() + 1);
                entries.push((TAG_KEY.to_owned(), Tree::String(tags[idx].clone().into_owned())));
                entries.extend(rec.entries);
                Tree::Object(entries)
            },
        ))
    }
}

fn check_plan(ty: &'static str, fields: &[FieldMeta]) -> DeriveResult<()> {
    for (i, field) in fields.iter().enumerate() {
        if field.key.is_empty() {
            return Err(DeriveError::MalformedAnnotation {
                ty,
                detail: format!("field `{}` renames to the empty string", field.original),
            });
        }
        if field.key == TAG_KEY {
            return Err(DeriveError::MalformedAnnotation {
                ty,
                detail: format!(
                    "field `{}` may not use the reserved key `{TAG_KEY}`",
                    field.original
                ),
            });
        }
        if fields[..i].iter().any(|prior| prior.key == field.key) {
            return Err(DeriveError::DuplicateKey {
                ty,
                key: field.key.clone().into_owned(),
            });
        }
        if field.variadic && i + 1 != fields.len() {
            return Err(DeriveError::MisplacedVariadic {
                ty,
                field: field.original.clone().into_owned(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::knot::Knot;
    use crate::tree::TreeKind;

    fn point_converter() -> Converter<(i32, i32)> {
        let mut knot = Knot::new();
        let x = knot.resolve::<i32>().unwrap();
        let y = knot.resolve::<i32>().unwrap();
        let rx = x.clone();
        let ry = y.clone();
        ProductBuilder::new("Point")
            .field(FieldMeta::new("x").with_default())
            .field(FieldMeta::new("y").with_default())
            .construct(move |f| {
                Ok((f.defaulted("x", &rx, || 0)?, f.defaulted("y", &ry, || 0)?))
            })
            .deconstruct(move |(px, py), rec| {
                if *px != 0 {
                    rec.put("x", x.write(px));
                }
                if *py != 0 {
                    rec.put("y", y.write(py));
                }
            })
            .finish()
            .unwrap()
    }

    #[test]
    fn default_valued_fields_are_omitted() {
        let conv = point_converter();
        assert_eq!(
            conv.write(&(0, 5)),
            Tree::Object(vec![("y".to_owned(), Tree::Num(5.0))])
        );
        assert_eq!(conv.read(&conv.write(&(0, 5))), Ok((0, 5)));
        assert_eq!(conv.write(&(0, 0)), Tree::Object(vec![]));
    }

    #[test]
    fn non_object_nodes_are_rejected() {
        let conv = point_converter();
        assert_eq!(
            conv.read(&Tree::Array(vec![])),
            Err(ReadError::ExpectedObject {
                ty: "Point",
                found: TreeKind::Array,
            })
        );
    }

    #[test]
    fn missing_required_field_is_named() {
        let mut knot = Knot::new();
        let x = knot.resolve::<i32>().unwrap();
        let rx = x.clone();
        let conv = ProductBuilder::<i32>::new("Wrapper")
            .field(FieldMeta::new("x"))
            .construct(move |f| f.required("x", &rx))
            .deconstruct(move |v, rec| rec.put("x", x.write(v)))
            .finish()
            .unwrap();
        assert_eq!(
            conv.read(&Tree::Object(vec![])),
            Err(ReadError::MissingField {
                ty: "Wrapper",
                field: "x".to_owned(),
            })
        );
    }

    #[test]
    fn plan_invariants_are_enforced() {
        let dup = ProductBuilder::<i32>::new("Dup")
            .field(FieldMeta::new("a").rename("k"))
            .field(FieldMeta::new("b").rename("k"))
            .construct(|_| Ok(0))
            .deconstruct(|_, _| {})
            .finish();
        assert_eq!(
            dup.unwrap_err(),
            DeriveError::DuplicateKey {
                ty: "Dup",
                key: "k".to_owned(),
            }
        );

        let reserved = ProductBuilder::<i32>::new("Tagged")
            .field(FieldMeta::new("f").rename(TAG_KEY))
            .construct(|_| Ok(0))
            .deconstruct(|_, _| {})
            .finish();
        assert!(matches!(
            reserved.unwrap_err(),
            DeriveError::MalformedAnnotation { ty: "Tagged", .. }
        ));

        let misplaced = ProductBuilder::<i32>::new("Var")
            .field(FieldMeta::new("xs").variadic())
            .field(FieldMeta::new("last"))
            .construct(|_| Ok(0))
            .deconstruct(|_, _| {})
            .finish();
        assert_eq!(
            misplaced.unwrap_err(),
            DeriveError::MisplacedVariadic {
                ty: "Var",
                field: "xs".to_owned(),
            }
        );
    }

    #[test]
    fn empty_sum_is_rejected() {
        let none = SumBuilder::<i32>::new("Never").select(|_, _| 0).finish();
        assert_eq!(none.unwrap_err(), DeriveError::NoVariants { ty: "Never" });
    }

    #[test]
    fn sum_tags_round_trip_exactly() {
        let mut knot = Knot::new();
        let num = knot.resolve::<i32>().unwrap();
        let rnum = num.clone();
        // Either-style sum over (0, n) and (1, n) pairs.
        let conv = SumBuilder::<(u8, i32)>::new("Either")
            .variant(VariantArm::new(
                "Lhs",
                vec![FieldMeta::new("value")],
                move |f| Ok((0, f.required("value", &rnum)?)),
            ))
            .variant({
                let mut knot = Knot::new();
                let num = knot.resolve::<i32>().unwrap();
                VariantArm::new("weird \"tag\"", vec![FieldMeta::new("value")], move |f| {
                    Ok((1, f.required("value", &num)?))
                })
            })
            .select(move |(side, value), rec| {
                rec.put("value", num.write(value));
                *side as usize
            })
            .finish()
            .unwrap();

        let written = conv.write(&(1, 9));
        assert_eq!(
            written.field(TAG_KEY),
            Some(&Tree::String("weird \"tag\"".to_owned()))
        );
        assert_eq!(conv.read(&written), Ok((1, 9)));

        let unknown = Tree::Object(vec![(
            TAG_KEY.to_owned(),
            Tree::String("Rhs".to_owned()),
        )]);
        assert_eq!(
            conv.read(&unknown),
            Err(ReadError::UnknownVariant {
                ty: "Either",
                tag: "Rhs".to_owned(),
            })
        );
    }

    #[test]
    fn singleton_ignores_content() {
        #[derive(Debug, PartialEq)]
        struct Marker;
        let conv = singleton(|| Marker);
        assert_eq!(conv.write(&Marker), Tree::Object(vec![]));
        assert_eq!(conv.read(&Tree::Null), Ok(Marker));
        assert_eq!(
            conv.read(&Tree::Object(vec![("junk".to_owned(), Tree::Bool(true))])),
            Ok(Marker)
        );
    }
}
