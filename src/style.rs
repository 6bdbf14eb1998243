//! Style properties and their resolution down the tree.
//!
//! This module provides:
//!
//! - [`PropertyKey`] / [`PropertyValue`] / [`PropertyMap`]: an open property
//!   bag keyed by static names
//! - [`Selector`]: what a style rule matches on
//! - [`StyleSheet`]: the rule source consulted during resolution, with
//!   [`RuleSheet`] as a table-backed implementation
//! - [`TextProperties`]: the typed subset a text shaper needs
//!
//! A node's resolved style is its parent's resolved style overlaid with the
//! properties its own selector matches. Emphasis flips the inherited font
//! style. Results are cached per node and dropped when the node itself is
//! edited or moved; edits to an ancestor do not reach cached descendants,
//! use [`NodeRef::invalidate_styles`] for that.
//!
//! # Examples
//!
//! ```
//! use doctree::style::{FontStyle, PropertyKey, PropertyValue, RuleSheet, Selector};
//! use doctree::{NodeRef, NodeType};
//!
//! let sheet = RuleSheet::standard();
//! let root = NodeRef::root(vec![NodeRef::paragraph(vec![NodeRef::emphasis(vec![
//!     NodeRef::text("hi"),
//! ])])]);
//! let emphasis = root.child(0).child(0);
//! let style = emphasis.resolved_style(&sheet);
//! assert_eq!(
//!     style.get(&PropertyKey::FONT_STYLE),
//!     Some(&PropertyValue::FontStyle(FontStyle::Italic))
//! );
//! assert_eq!(Selector::of(&emphasis), Selector::Node(NodeType::Emphasis));
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use crate::node::{ElementKind, MathKind, NodeRef, NodeType};

/// Name of a style property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyKey(&'static str);

impl PropertyKey {
    pub const FONT_FAMILY: Self = Self("font.family");
    pub const FONT_SIZE: Self = Self("font.size");
    pub const FONT_STYLE: Self = Self("font.style");
    pub const FONT_WEIGHT: Self = Self("font.weight");
    pub const FOREGROUND: Self = Self("text.foreground");
    pub const TEXT_ALIGN: Self = Self("paragraph.align");
    pub const PARAGRAPH_SPACING: Self = Self("paragraph.spacing");

    /// A key outside the built-in set.
    #[must_use]
    pub const fn custom(name: &'static str) -> Self {
        Self(name)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

impl FontStyle {
    #[must_use]
    pub const fn inverted(self) -> Self {
        match self {
            Self::Normal => Self::Italic,
            Self::Italic => Self::Normal,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FontWeight {
    #[default]
    Regular,
    Bold,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextAlign {
    #[default]
    Start,
    Center,
    End,
}

/// Value of a style property.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(Rc<str>),
    FontStyle(FontStyle),
    FontWeight(FontWeight),
    TextAlign(TextAlign),
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(Rc::from(value))
    }
}

impl From<FontStyle> for PropertyValue {
    fn from(value: FontStyle) -> Self {
        Self::FontStyle(value)
    }
}

impl From<FontWeight> for PropertyValue {
    fn from(value: FontWeight) -> Self {
        Self::FontWeight(value)
    }
}

impl From<TextAlign> for PropertyValue {
    fn from(value: TextAlign) -> Self {
        Self::TextAlign(value)
    }
}

pub type PropertyMap = BTreeMap<PropertyKey, PropertyValue>;

/// What a style rule applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Every node of a type.
    Node(NodeType),
    /// Headings of one level.
    Heading(u8),
    /// Inline or display equations.
    Equation { is_block: bool },
}

impl Selector {
    /// The most specific selector matching `node`.
    #[must_use]
    pub fn of(node: &NodeRef) -> Self {
        if let Some(ElementKind::Heading { level }) = node.element_kind() {
            return Self::Heading(level);
        }
        if let Some(MathKind::Equation { is_block }) = node.math_kind() {
            return Self::Equation { is_block };
        }
        Self::Node(node.node_type())
    }

    #[must_use]
    pub const fn node_type(self) -> NodeType {
        match self {
            Self::Node(node_type) => node_type,
            Self::Heading(_) => NodeType::Heading,
            Self::Equation { .. } => NodeType::Equation,
        }
    }

    /// The type-wide selector this one refines, if any.
    #[must_use]
    pub const fn generic(self) -> Option<Self> {
        match self {
            Self::Node(_) => None,
            Self::Heading(_) | Self::Equation { .. } => Some(Self::Node(self.node_type())),
        }
    }
}

/// Source of style rules.
pub trait StyleSheet {
    /// Properties set by rules matching `selector`, or `None` when no rule
    /// applies.
    fn properties(&self, selector: &Selector) -> Option<PropertyMap>;

    /// Properties in effect at the root.
    fn defaults(&self) -> PropertyMap;
}

/// Table-backed [`StyleSheet`].
///
/// A specialised selector sees the type-wide rule overlaid with its own.
#[derive(Clone, Debug, Default)]
pub struct RuleSheet {
    defaults: PropertyMap,
    rules: HashMap<Selector, PropertyMap>,
}

impl RuleSheet {
    #[must_use]
    pub fn new(defaults: PropertyMap) -> Self {
        Self {
            defaults,
            rules: HashMap::new(),
        }
    }

    /// Add properties to the rule for `selector`.
    #[must_use]
    pub fn with_rule<I, V>(mut self, selector: Selector, properties: I) -> Self
    where
        I: IntoIterator<Item = (PropertyKey, V)>,
        V: Into<PropertyValue>,
    {
        self.set_rule(selector, properties);
        self
    }

    pub fn set_rule<I, V>(&mut self, selector: Selector, properties: I)
    where
        I: IntoIterator<Item = (PropertyKey, V)>,
        V: Into<PropertyValue>,
    {
        let rule = self.rules.entry(selector).or_default();
        rule.extend(properties.into_iter().map(|(k, v)| (k, v.into())));
    }

    /// A serif body face with bold, scaled headings and centred display
    /// equations.
    #[must_use]
    pub fn standard() -> Self {
        let defaults = PropertyMap::from([
            (PropertyKey::FONT_FAMILY, PropertyValue::from("serif")),
            (PropertyKey::FONT_SIZE, PropertyValue::Float(12.0)),
            (PropertyKey::FONT_STYLE, FontStyle::Normal.into()),
            (PropertyKey::FONT_WEIGHT, FontWeight::Regular.into()),
            (PropertyKey::FOREGROUND, PropertyValue::from("#000000")),
            (PropertyKey::TEXT_ALIGN, TextAlign::Start.into()),
        ]);
        Self::new(defaults)
            .with_rule(
                Selector::Node(NodeType::Heading),
                [(PropertyKey::FONT_WEIGHT, FontWeight::Bold)],
            )
            .with_rule(Selector::Heading(1), [(PropertyKey::FONT_SIZE, 20.0)])
            .with_rule(Selector::Heading(2), [(PropertyKey::FONT_SIZE, 16.0)])
            .with_rule(Selector::Heading(3), [(PropertyKey::FONT_SIZE, 14.0)])
            .with_rule(
                Selector::Node(NodeType::Paragraph),
                [(PropertyKey::PARAGRAPH_SPACING, 6.0)],
            )
            .with_rule(
                Selector::Equation { is_block: true },
                [(PropertyKey::TEXT_ALIGN, TextAlign::Center)],
            )
    }
}

impl StyleSheet for RuleSheet {
    fn properties(&self, selector: &Selector) -> Option<PropertyMap> {
        let generic = selector.generic().and_then(|g| self.rules.get(&g));
        let specific = self.rules.get(selector);
        match (generic, specific) {
            (None, None) => None,
            (Some(rule), None) | (None, Some(rule)) => Some(rule.clone()),
            (Some(generic), Some(specific)) => {
                let mut merged = generic.clone();
                merged.extend(specific.iter().map(|(k, v)| (*k, v.clone())));
                Some(merged)
            }
        }
    }

    fn defaults(&self) -> PropertyMap {
        self.defaults.clone()
    }
}

/// Typed view of the properties a text shaper consumes.
#[derive(Clone, Debug, PartialEq)]
pub struct TextProperties {
    pub font_family: Rc<str>,
    pub font_size: f64,
    pub font_style: FontStyle,
    pub font_weight: FontWeight,
    pub foreground: Rc<str>,
}

impl TextProperties {
    /// Read from `map`, falling back to `defaults`, then to built-in values.
    #[must_use]
    pub fn resolve(map: &PropertyMap, defaults: &PropertyMap) -> Self {
        let get = |key: PropertyKey| map.get(&key).or_else(|| defaults.get(&key));
        let font_family = match get(PropertyKey::FONT_FAMILY) {
            Some(PropertyValue::String(family)) => Rc::clone(family),
            _ => Rc::from("serif"),
        };
        #[allow(clippy::cast_precision_loss)]
        let font_size = match get(PropertyKey::FONT_SIZE) {
            Some(PropertyValue::Float(size)) => *size,
            Some(PropertyValue::Integer(size)) => *size as f64,
            _ => 12.0,
        };
        let font_style = match get(PropertyKey::FONT_STYLE) {
            Some(PropertyValue::FontStyle(style)) => *style,
            _ => FontStyle::Normal,
        };
        let font_weight = match get(PropertyKey::FONT_WEIGHT) {
            Some(PropertyValue::FontWeight(weight)) => *weight,
            _ => FontWeight::Regular,
        };
        let foreground = match get(PropertyKey::FOREGROUND) {
            Some(PropertyValue::String(color)) => Rc::clone(color),
            _ => Rc::from("#000000"),
        };
        Self {
            font_family,
            font_size,
            font_style,
            font_weight,
            foreground,
        }
    }
}

impl NodeRef {
    /// Parent style overlaid with this node's matched rules, cached.
    pub fn resolved_style(&self, sheet: &dyn StyleSheet) -> Rc<PropertyMap> {
        if let Some(cached) = self.node().style.as_ref() {
            return Rc::clone(cached);
        }

        let mut map = match self.parent() {
            Some(parent) => (*parent.resolved_style(sheet)).clone(),
            None => sheet.defaults(),
        };
        let selector = Selector::of(self);
        if let Some(own) = sheet.properties(&selector) {
            map.extend(own);
        }
        if selector.node_type() == NodeType::Emphasis {
            let inherited = match map.get(&PropertyKey::FONT_STYLE) {
                Some(PropertyValue::FontStyle(style)) => *style,
                _ => FontStyle::Normal,
            };
            map.insert(PropertyKey::FONT_STYLE, inherited.inverted().into());
        }

        let map = Rc::new(map);
        self.node_mut().style = Some(Rc::clone(&map));
        map
    }

    /// Typed text properties of this node.
    pub fn text_properties(&self, sheet: &dyn StyleSheet) -> TextProperties {
        TextProperties::resolve(&self.resolved_style(sheet), &sheet.defaults())
    }

    /// Drop cached styles throughout the current subtree.
    pub fn invalidate_styles(&self) {
        self.node_mut().style = None;
        for child in self.children() {
            child.invalidate_styles();
        }
        for component in self.components() {
            component.invalidate_styles();
        }
    }

    #[must_use]
    pub fn has_cached_style(&self) -> bool {
        self.node().style.is_some()
    }
}
