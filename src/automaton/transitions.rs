//! Transition records and the compiled states that own them
//!
//! Each compiled state carries seven families of outgoing edges. A family is a
//! [`Chain`]: an immutable, `Arc`-linked list whose tail may be shared with the
//! chain of another state (the decoder appends a state's own records in front
//! of its linked-next state's chain).

use super::TextSensitivity;
use crate::attributes::AttributeView;
use crate::datatypes::{DataValue, Datatype, ValidationContext};
use crate::names::NameCode;
use std::fmt;
use std::sync::Arc;

/// Index of a compiled state in its schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SingleId(pub u32);

impl SingleId {
    /// Position in the schema state table
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SingleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index of an interleave transition in its schema; identifies an interleave alphabet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterleaveId(pub u32);

impl InterleaveId {
    /// Position in the schema interleave table
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Mask/test pair matched against name codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NameSignature {
    /// Bits of the name code that are tested
    pub mask: u32,
    /// Expected value of the tested bits
    pub test: u32,
}

impl NameSignature {
    /// Create a signature
    pub fn new(mask: u32, test: u32) -> Self {
        Self { mask, test }
    }

    /// Signature matching exactly one name code
    pub fn exact(code: NameCode) -> Self {
        Self::new(u32::MAX, code)
    }

    /// True if the mask tests every bit
    pub fn is_exact(&self) -> bool {
        self.mask == u32::MAX
    }

    /// Check a name code against this signature
    pub fn accepts(&self, code: NameCode) -> bool {
        code & self.mask == self.test
    }
}

// =============================================================================
// Chains
// =============================================================================

#[derive(Debug)]
struct Link<T> {
    record: T,
    next: Option<Arc<Link<T>>>,
}

/// Immutable singly linked list of transition records
#[derive(Debug)]
pub struct Chain<T> {
    head: Option<Arc<Link<T>>>,
}

impl<T> Chain<T> {
    /// The empty chain
    pub fn empty() -> Self {
        Self { head: None }
    }

    /// New chain with `record` in front of `self`; `self` is shared, not copied
    pub fn prepend(&self, record: T) -> Self {
        Self {
            head: Some(Arc::new(Link {
                record,
                next: self.head.clone(),
            })),
        }
    }

    /// Iterate from the head
    pub fn iter(&self) -> ChainIter<'_, T> {
        ChainIter {
            cursor: self.head.as_deref(),
        }
    }

    /// Number of records, shared tail included
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// True if the chain has no records
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// True if both chains are the very same list
    pub fn ptr_eq(&self, other: &Chain<T>) -> bool {
        match (&self.head, &other.head) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Chain starting after the first record
    pub fn tail(&self) -> Chain<T> {
        Self {
            head: self.head.as_ref().and_then(|link| link.next.clone()),
        }
    }
}

impl<T> Clone for Chain<T> {
    fn clone(&self) -> Self {
        Self {
            head: self.head.clone(),
        }
    }
}

impl<T> Default for Chain<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Iterator over a [`Chain`]
pub struct ChainIter<'a, T> {
    cursor: Option<&'a Link<T>>,
}

impl<'a, T> Iterator for ChainIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let link = self.cursor?;
        self.cursor = link.next.as_deref();
        Some(&link.record)
    }
}

impl<'a, T> IntoIterator for &'a Chain<T> {
    type Item = &'a T;
    type IntoIter = ChainIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// =============================================================================
// Records
// =============================================================================

/// Attribute presence: consume attributes whose name matches and whose value
/// makes `left` final
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttTransition {
    /// Attribute names accepted
    pub signature: NameSignature,
    /// More than one attribute may match
    pub repeated: bool,
    /// Pattern the attribute value is validated against
    pub left: SingleId,
    /// Continuation
    pub right: SingleId,
}

/// Text accepted by a datatype, unless the except pattern matches it
#[derive(Debug, Clone)]
pub struct DataTransition {
    /// Datatype checking the text
    pub datatype: Arc<dyn Datatype>,
    /// Except pattern; the transition is blocked when it accepts the text
    pub left: SingleId,
    /// Continuation
    pub right: SingleId,
}

/// Child element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementTransition {
    /// Element names accepted
    pub signature: NameSignature,
    /// Content model of the child
    pub left: SingleId,
    /// Continuation once the child is closed
    pub right: SingleId,
}

/// Split into two interleaved branches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterleaveTransition {
    /// Alphabet identity of this split
    pub id: InterleaveId,
    /// Left branch
    pub left: SingleId,
    /// Right branch
    pub right: SingleId,
    /// State entered once both branches are final
    pub join: SingleId,
    /// Text is routed to the left branch (otherwise to the right one)
    pub text_to_left: bool,
}

/// Whitespace-separated token list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListTransition {
    /// Item pattern fed token by token
    pub left: SingleId,
    /// Continuation
    pub right: SingleId,
}

/// Attribute absence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoAttTransition {
    /// Continuation
    pub right: SingleId,
    /// Names that are forbidden unless a positive signature also matches
    pub negative: Vec<NameSignature>,
    /// Names that are always allowed
    pub positive: Vec<NameSignature>,
}

impl NoAttTransition {
    /// An attribute name is forbidden iff no positive signature accepts it and
    /// some negative signature does
    pub fn forbids(&self, code: NameCode) -> bool {
        !self.positive.iter().any(|sig| sig.accepts(code))
            && self.negative.iter().any(|sig| sig.accepts(code))
    }

    /// True if no attribute of the element is forbidden
    pub fn accepts(&self, attributes: &AttributeView) -> bool {
        !attributes.iter().any(|attr| self.forbids(attr.name))
    }
}

/// Text equal to a literal value
pub struct ValueTransition {
    /// Datatype defining the value space
    pub datatype: Arc<dyn Datatype>,
    /// The literal, already converted to a value
    pub value: DataValue,
    /// Continuation
    pub right: SingleId,
}

impl ValueTransition {
    /// True if `text` denotes the stored value
    pub fn accepts(&self, text: &str, context: &dyn ValidationContext) -> bool {
        self.datatype
            .create_value(text, context)
            .map_or(false, |value| self.datatype.same_value(&value, &self.value))
    }
}

impl fmt::Debug for ValueTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueTransition")
            .field("datatype", &self.datatype)
            .field("right", &self.right)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Element lookup table
// =============================================================================

/// Element transitions of one state, split for lookup.
///
/// Exact-name transitions are sorted by name code and binary searched; the
/// rest are scanned in chain order.
#[derive(Debug, Clone, Default)]
pub struct ElementTable {
    quick: Vec<ElementTransition>,
    others: Vec<ElementTransition>,
}

impl ElementTable {
    /// Build the table from a decoded chain
    pub fn from_chain(chain: &Chain<ElementTransition>) -> Self {
        let (mut quick, others): (Vec<_>, Vec<_>) =
            chain.iter().copied().partition(|e| e.signature.is_exact());
        quick.sort_by_key(|e| e.signature.test);
        Self { quick, others }
    }

    /// Transitions accepting `code`: exact matches first, then the scanned ones
    pub fn matching(&self, code: NameCode) -> impl Iterator<Item = &ElementTransition> {
        let start = self.quick.partition_point(|e| e.signature.test < code);
        let end = start + self.quick[start..].partition_point(|e| e.signature.test == code);
        self.quick[start..end]
            .iter()
            .chain(self.others.iter().filter(move |e| e.signature.accepts(code)))
    }

    /// All element transitions
    pub fn iter(&self) -> impl Iterator<Item = &ElementTransition> {
        self.quick.iter().chain(self.others.iter())
    }

    /// Number of element transitions
    pub fn len(&self) -> usize {
        self.quick.len() + self.others.len()
    }

    /// True if the state has no element transitions
    pub fn is_empty(&self) -> bool {
        self.quick.is_empty() && self.others.is_empty()
    }
}

// =============================================================================
// Compiled states
// =============================================================================

/// A compiled state of the schema graph
#[derive(Debug)]
pub struct SingleState {
    pub(crate) id: SingleId,
    pub(crate) is_final: bool,
    pub(crate) is_persistent: bool,
    pub(crate) text_sensitivity: TextSensitivity,
    pub(crate) att: Chain<AttTransition>,
    pub(crate) data: Chain<DataTransition>,
    pub(crate) element: ElementTable,
    pub(crate) interleave: Chain<InterleaveTransition>,
    pub(crate) list: Chain<ListTransition>,
    pub(crate) no_att: Chain<NoAttTransition>,
    pub(crate) value: Chain<ValueTransition>,
}

impl SingleState {
    pub(crate) fn new(
        id: SingleId,
        is_final: bool,
        is_persistent: bool,
        text_sensitivity: TextSensitivity,
    ) -> Self {
        Self {
            id,
            is_final,
            is_persistent,
            text_sensitivity,
            att: Chain::empty(),
            data: Chain::empty(),
            element: ElementTable::default(),
            interleave: Chain::empty(),
            list: Chain::empty(),
            no_att: Chain::empty(),
            value: Chain::empty(),
        }
    }

    /// Index of the state
    pub fn id(&self) -> SingleId {
        self.id
    }

    /// The state accepts the end of its content
    pub fn is_final(&self) -> bool {
        self.is_final
    }

    /// The state survives every epsilon-closure
    pub fn is_persistent(&self) -> bool {
        self.is_persistent
    }

    /// How the state reacts to text
    pub fn text_sensitivity(&self) -> TextSensitivity {
        self.text_sensitivity
    }

    /// True if expansion can produce anything other than the state itself
    pub fn is_expandable(&self) -> bool {
        !self.att.is_empty() || !self.no_att.is_empty() || !self.interleave.is_empty()
    }

    /// True if the state has no outgoing transitions at all
    pub fn has_no_transitions(&self) -> bool {
        self.att.is_empty()
            && self.data.is_empty()
            && self.element.is_empty()
            && self.interleave.is_empty()
            && self.list.is_empty()
            && self.no_att.is_empty()
            && self.value.is_empty()
    }

    /// Attribute presence transitions
    pub fn att(&self) -> &Chain<AttTransition> {
        &self.att
    }

    /// Datatype transitions
    pub fn data(&self) -> &Chain<DataTransition> {
        &self.data
    }

    /// Element transitions
    pub fn element(&self) -> &ElementTable {
        &self.element
    }

    /// Interleave split transitions
    pub fn interleave(&self) -> &Chain<InterleaveTransition> {
        &self.interleave
    }

    /// List transitions
    pub fn list(&self) -> &Chain<ListTransition> {
        &self.list
    }

    /// Attribute absence transitions
    pub fn no_att(&self) -> &Chain<NoAttTransition> {
        &self.no_att
    }

    /// Literal value transitions
    pub fn value(&self) -> &Chain<ValueTransition> {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::NamespaceScope;

    fn element(mask: u32, test: u32, left: u32) -> ElementTransition {
        ElementTransition {
            signature: NameSignature::new(mask, test),
            left: SingleId(left),
            right: SingleId(0),
        }
    }

    #[test]
    fn test_signature_accepts() {
        let exact = NameSignature::exact(5);
        assert!(exact.accepts(5));
        assert!(!exact.accepts(4));

        // every code whose low byte is 0x10
        let family = NameSignature::new(0xFF, 0x10);
        assert!(family.accepts(0x110));
        assert!(family.accepts(0x10));
        assert!(!family.accepts(0x11));
    }

    #[test]
    fn test_chain_shares_tail() {
        let tail = Chain::empty().prepend(3).prepend(2);
        let a = tail.prepend(1);
        let b = tail.prepend(10);

        assert_eq!(a.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(b.iter().copied().collect::<Vec<_>>(), vec![10, 2, 3]);
        assert!(a.tail().ptr_eq(&b.tail()));
        assert_eq!(tail.len(), 2);
    }

    #[test]
    fn test_element_table_lookup() {
        let chain = Chain::empty()
            .prepend(element(u32::MAX, 7, 1))
            .prepend(element(0xF0, 0x00, 2))
            .prepend(element(u32::MAX, 3, 3))
            .prepend(element(u32::MAX, 7, 4));
        let table = ElementTable::from_chain(&chain);

        let hits: Vec<_> = table.matching(7).map(|e| e.left.0).collect();
        assert_eq!(hits, vec![4, 1, 2]);
        let hits: Vec<_> = table.matching(3).map(|e| e.left.0).collect();
        assert_eq!(hits, vec![3, 2]);
        assert_eq!(table.matching(0x20).count(), 0);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_no_att_forbidden_names() {
        let t = NoAttTransition {
            right: SingleId(0),
            negative: vec![NameSignature::new(0, 0)],
            positive: vec![NameSignature::exact(1), NameSignature::exact(2)],
        };
        assert!(!t.forbids(1));
        assert!(t.forbids(3));

        let mut attrs = AttributeView::new(NamespaceScope::new());
        attrs.push(1, "x");
        assert!(t.accepts(&attrs));
        attrs.push(9, "y");
        assert!(!t.accepts(&attrs));
        assert!(t.accepts(AttributeView::empty()));
    }
}
