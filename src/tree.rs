use std::{
    borrow::Borrow,
    cmp::{self, Ordering},
    iter::FromIterator,
    mem,
    ops::{Deref, Index},
};

use log::{debug, trace};
use rand::Rng;

use crate::depth::Depth;
use crate::error::Error;

/// OrderedTree manage a single instance of in-memory sorted values using
/// an [AVL][avl] tree, where every node also counts the values in its
/// subtree. The counts make the tree behave like a sorted sequence that
/// can be indexed by rank in O(log n).
///
/// Duplicate values are permitted. They are told apart only by their
/// position in the sorted order.
///
/// ```
/// use avl_index::OrderedTree;
///
/// let mut tree: OrderedTree<String> = OrderedTree::new("names");
/// tree.insert("foo".to_string());
/// tree.insert("bar".to_string());
///
/// assert_eq!(tree.find("foo"), Some(1));
/// assert_eq!(tree[0], "bar");
/// ```
///
/// [avl]: https://en.wikipedia.org/wiki/AVL_tree
#[derive(Clone)]
pub struct OrderedTree<T>
where
    T: Clone + Ord,
{
    name: String,
    root: Option<Box<Node<T>>>,
    n_count: usize, // number of entries in the tree.
}

/// Different ways to construct a new OrderedTree instance.
impl<T> OrderedTree<T>
where
    T: Clone + Ord,
{
    /// Create an empty instance of OrderedTree, identified by `name`.
    /// Applications can choose unique names.
    pub fn new<S>(name: S) -> OrderedTree<T>
    where
        S: AsRef<str>,
    {
        OrderedTree {
            name: name.as_ref().to_string(),
            root: Default::default(),
            n_count: Default::default(),
        }
    }

    /// Create a new instance of OrderedTree and load it with values
    /// from `iter`. Values need not be unique.
    pub fn load_from<S, I>(name: S, iter: I) -> OrderedTree<T>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = T>,
    {
        let mut tree = OrderedTree::new(name);
        tree.extend(iter);
        debug!("{}: loaded {} entries", tree.name, tree.n_count);
        tree
    }
}

/// Maintenance API.
impl<T> OrderedTree<T>
where
    T: Clone + Ord,
{
    /// Identify this instance. Applications can choose unique names while
    /// creating OrderedTree instances.
    #[inline]
    pub fn id(&self) -> String {
        self.name.clone()
    }

    /// Return number of entries in this instance.
    #[inline]
    pub fn len(&self) -> usize {
        self.n_count
    }

    /// Check whether this index is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_count == 0
    }

    /// Return quickly with basic statisics, depths() is valid only for
    /// statistics returned by validate().
    pub fn stats(&self) -> Stats {
        let root = self.root.as_ref().map(Deref::deref);
        Stats::new(self.n_count, mem::size_of::<Node<T>>(), height(root))
    }

    /// Validate the tree with following rules:
    ///
    /// * In-order walk yields values in non-decreasing order.
    /// * Height of left child and right child differ at most by one.
    /// * Cached count and height of every node match its subtree.
    /// * Number of nodes match the entry counter.
    ///
    /// Additionally return full statistics on the tree. Refer to [`Stats`]
    /// for more information.
    pub fn validate(&self) -> Result<Stats, Error<T>> {
        let root = self.root.as_ref().map(Deref::deref);
        let mut stats = self.stats();
        stats.set_depths(Depth::new());
        let mut prev: Option<&T> = None;
        let found = OrderedTree::validate_tree(root, 1, &mut prev, &mut stats)?;
        if found != self.n_count {
            let expected = self.n_count;
            return Err(Error::SizeMismatch { expected, found });
        }
        Ok(stats)
    }
}

type Erase<T> = (Option<Box<Node<T>>>, Option<T>);

type Delmin<T> = (Option<Box<Node<T>>>, Box<Node<T>>);

/// Write operations on OrderedTree instance.
impl<T> OrderedTree<T>
where
    T: Clone + Ord,
{
    /// Insert value into the index. Values comparing equal to an existing
    /// value are placed after it in the sorted order.
    pub fn insert(&mut self, value: T) {
        let root = OrderedTree::do_insert(self.root.take(), value);
        self.root = Some(root);
        self.n_count += 1;
    }

    /// Erase one value comparing equal to `value` and return it. If
    /// there are duplicates, the first one met while walking down from
    /// the root is removed. Fail with [`Error::NotFound`] if no value
    /// matches, in which case the tree is unchanged.
    pub fn erase<Q>(&mut self, value: &Q) -> Result<T, Error<T>>
    where
        T: Borrow<Q>,
        Q: Ord + ToOwned<Owned = T> + ?Sized,
    {
        if self.find(value).is_none() {
            return Err(Error::NotFound(value.to_owned()));
        }
        let (root, old_value) = OrderedTree::do_erase(self.root.take(), value);
        self.root = root;
        match old_value {
            Some(old_value) => {
                self.n_count -= 1;
                Ok(old_value)
            }
            None => unreachable!("erase(): value found but not removed"),
        }
    }

    /// Remove all values. Nodes are released with an explicit stack so
    /// that the call depth does not grow with the tree.
    pub fn clear(&mut self) {
        let mut stack: Vec<Box<Node<T>>> = self.root.take().into_iter().collect();
        let mut n: usize = 0;
        while let Some(mut node) = stack.pop() {
            stack.extend(node.left.take());
            stack.extend(node.right.take());
            n += 1;
        }
        if n > 0 {
            debug!("{}: cleared {} entries", self.name, n);
        }
        self.n_count = 0;
    }
}

/// Read operations on OrderedTree instance.
impl<T> OrderedTree<T>
where
    T: Clone + Ord,
{
    /// Return the rank of a value comparing equal to `value`, the first
    /// one met while walking down from the root.
    pub fn find<Q>(&self, value: &Q) -> Option<usize>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut node = self.root.as_ref().map(Deref::deref);
        let mut offset = 0;
        while let Some(nref) = node {
            node = match nref.value.borrow().cmp(value) {
                Ordering::Greater => nref.left_deref(),
                Ordering::Less => {
                    offset += nref.left_count() + 1;
                    nref.right_deref()
                }
                Ordering::Equal => return Some(offset + nref.left_count()),
            };
        }
        None
    }

    /// Check whether a value comparing equal to `value` is present.
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(value).is_some()
    }

    /// Return the value at rank `index` in sorted order.
    pub fn select(&self, index: usize) -> Result<&T, Error<T>> {
        let size = self.n_count;
        if index >= size {
            return Err(Error::OutOfRange { index, size });
        }

        let mut node = self.root.as_ref().map(Deref::deref);
        let mut rank = index;
        while let Some(nref) = node {
            let left_count = nref.left_count();
            node = match rank.cmp(&left_count) {
                Ordering::Equal => return Ok(&nref.value),
                Ordering::Less => nref.left_deref(),
                Ordering::Greater => {
                    rank -= left_count + 1;
                    nref.right_deref()
                }
            };
        }
        Err(Error::OutOfRange { index, size })
    }

    /// Return the rank of the first value that is `>= value`, or len()
    /// if there is none.
    pub fn lower_bound<Q>(&self, value: &Q) -> usize
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.bound_by(|nref| Borrow::<Q>::borrow(&nref.value) < value)
    }

    /// Return the rank of the first value that is `> value`, or len()
    /// if there is none.
    pub fn upper_bound<Q>(&self, value: &Q) -> usize
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.bound_by(|nref| Borrow::<Q>::borrow(&nref.value) <= value)
    }

    /// Return the smallest value.
    pub fn first(&self) -> Option<&T> {
        self.select(0).ok()
    }

    /// Return the largest value.
    pub fn last(&self) -> Option<&T> {
        self.n_count.checked_sub(1).and_then(|i| self.select(i).ok())
    }

    /// Return a random entry from this index, every entry being equally
    /// likely.
    pub fn random<R: Rng>(&self, rng: &mut R) -> Option<&T> {
        if self.n_count == 0 {
            return None;
        }
        self.select(rng.gen_range(0, self.n_count)).ok()
    }

    /// Return an iterator over all values in sorted order.
    pub fn iter(&self) -> Iter<'_, T> {
        let root = self.root.as_ref().map(Deref::deref);
        Iter::new(root, self.n_count)
    }

    #[cfg(test)]
    pub(crate) fn root_value(&self) -> Option<&T> {
        self.root.as_ref().map(|node| &node.value)
    }

    // rank of the first node for which `before` turns false, `before`
    // being true for a prefix of the sorted order.
    fn bound_by<F>(&self, before: F) -> usize
    where
        F: Fn(&Node<T>) -> bool,
    {
        let mut node = self.root.as_ref().map(Deref::deref);
        let mut rank = 0;
        while let Some(nref) = node {
            node = if before(nref) {
                rank += nref.left_count() + 1;
                nref.right_deref()
            } else {
                nref.left_deref()
            };
        }
        rank
    }
}

impl<T> OrderedTree<T>
where
    T: Clone + Ord,
{
    fn do_insert(node: Option<Box<Node<T>>>, value: T) -> Box<Node<T>> {
        let mut node = match node {
            None => return Node::new(value),
            Some(node) => node,
        };

        if node.value > value {
            node.left = Some(OrderedTree::do_insert(node.left.take(), value));
        } else {
            node.right = Some(OrderedTree::do_insert(node.right.take(), value));
        }
        OrderedTree::balance(node)
    }

    fn do_erase<Q>(node: Option<Box<Node<T>>>, value: &Q) -> Erase<T>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut node = match node {
            None => return (None, None),
            Some(node) => node,
        };

        match node.value.borrow().cmp(value) {
            Ordering::Greater => {
                let (left, old_value) = OrderedTree::do_erase(node.left.take(), value);
                node.left = left;
                (Some(OrderedTree::balance(node)), old_value)
            }
            Ordering::Less => {
                let (right, old_value) = OrderedTree::do_erase(node.right.take(), value);
                node.right = right;
                (Some(OrderedTree::balance(node)), old_value)
            }
            Ordering::Equal => {
                let Node {
                    value, left, right, ..
                } = *node;
                let root = match (left, right) {
                    (None, None) => None,
                    (Some(child), None) | (None, Some(child)) => Some(child),
                    (left, Some(right)) => {
                        // in-order successor takes over both subtrees.
                        let (right, mut successor) = OrderedTree::delete_min(right);
                        successor.left = left;
                        successor.right = right;
                        Some(OrderedTree::balance(successor))
                    }
                };
                (root, Some(value))
            }
        }
    }

    // detach the leftmost node, its right subtree takes its place.
    fn delete_min(mut node: Box<Node<T>>) -> Delmin<T> {
        match node.left.take() {
            None => (node.right.take(), node),
            Some(left) => {
                let (left, min_node) = OrderedTree::delete_min(left);
                node.left = left;
                (Some(OrderedTree::balance(node)), min_node)
            }
        }
    }

    fn validate_tree<'a>(
        node: Option<&'a Node<T>>,
        depth: usize,
        prev: &mut Option<&'a T>,
        stats: &mut Stats,
    ) -> Result<usize, Error<T>> {
        let node = match node {
            None => return Ok(0),
            Some(node) => node,
        };

        let (left, right) = (node.left_deref(), node.right_deref());
        if let (None, None, Some(depths)) = (left, right, stats.depths.as_mut()) {
            depths.sample(depth);
        }

        let lcount = OrderedTree::validate_tree(left, depth + 1, prev, stats)?;
        if let Some(pvalue) = prev.take() {
            if pvalue > &node.value {
                return Err(Error::SortError(pvalue.clone(), node.value.clone()));
            }
        }
        *prev = Some(&node.value);
        let rcount = OrderedTree::validate_tree(right, depth + 1, prev, stats)?;

        let (lheight, rheight) = (height(left), height(right));
        if (lheight as isize - rheight as isize).abs() > 1 {
            let err = format!("left: {} right: {}", lheight, rheight);
            return Err(Error::UnbalancedNode(err));
        }
        let want = cmp::max(lheight, rheight) + 1;
        if node.height != want {
            let err = format!("cached: {} computed: {}", node.height, want);
            return Err(Error::HeightMismatch(err));
        }
        let want = lcount + rcount + 1;
        if node.count != want {
            let err = format!("cached: {} computed: {}", node.count, want);
            return Err(Error::CountMismatch(err));
        }
        Ok(want)
    }

    //--------- rotation routines for AVL rebalancing ----------------

    // recompute count and height for `node`, then restore its balance
    // factor to -1, 0 or 1. Return the new root of this subtree.
    fn balance(mut node: Box<Node<T>>) -> Box<Node<T>> {
        node.update();
        let bf = node.balance_factor();
        let node = if bf >= 2 {
            if balance_factor(node.left_deref()) < 0 {
                node.left = node.left.take().map(OrderedTree::rotate_left);
            }
            OrderedTree::rotate_right(node)
        } else if bf <= -2 {
            if balance_factor(node.right_deref()) > 0 {
                node.right = node.right.take().map(OrderedTree::rotate_right);
            }
            OrderedTree::rotate_left(node)
        } else {
            node
        };
        debug_assert!(node.balance_factor().abs() <= 1);
        node
    }

    //              (i)                       (i)
    //               |                         |
    //              node                       x
    //              /  \                      / \
    //             /    \                    /   \
    //            /      \                  /     \
    //          left      x              node      xr
    //                   / \             /  \
    //                 xl   xr        left   xl
    //
    fn rotate_left(mut node: Box<Node<T>>) -> Box<Node<T>> {
        let mut x = match node.right.take() {
            Some(x) => x,
            None => panic!("rotate_left(): missing right child, call the programmer"),
        };
        trace!("rotate_left count:{} height:{}", node.count, node.height);
        node.right = x.left.take();
        node.update();
        x.left = Some(node);
        x.update();
        x
    }

    //              (i)                       (i)
    //               |                         |
    //              node                       x
    //              /  \                      / \
    //             /    \                    /   \
    //            /      \                  /     \
    //          x       right             xl      node
    //         / \                                / \
    //       xl   xr                             xr  right
    //
    fn rotate_right(mut node: Box<Node<T>>) -> Box<Node<T>> {
        let mut x = match node.left.take() {
            Some(x) => x,
            None => panic!("rotate_right(): missing left child, call the programmer"),
        };
        trace!("rotate_right count:{} height:{}", node.count, node.height);
        node.left = x.right.take();
        node.update();
        x.right = Some(node);
        x.update();
        x
    }
}

impl<T> Drop for OrderedTree<T>
where
    T: Clone + Ord,
{
    fn drop(&mut self) {
        self.clear()
    }
}

impl<T> Index<usize> for OrderedTree<T>
where
    T: Clone + Ord,
{
    type Output = T;

    /// Panics if `index` is out of range, use [`OrderedTree::select`] to
    /// handle that case.
    fn index(&self, index: usize) -> &T {
        match self.select(index) {
            Ok(value) => value,
            Err(_) => panic!(
                "index out of bounds: the len is {} but the index is {}",
                self.n_count, index
            ),
        }
    }
}

impl<T> Extend<T> for OrderedTree<T>
where
    T: Clone + Ord,
{
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = T>,
    {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<'a, T> IntoIterator for &'a OrderedTree<T>
where
    T: Clone + Ord,
{
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<T> FromIterator<T> for OrderedTree<T>
where
    T: Clone + Ord,
{
    fn from_iter<I>(iter: I) -> OrderedTree<T>
    where
        I: IntoIterator<Item = T>,
    {
        OrderedTree::load_from("", iter)
    }
}

fn height<T>(node: Option<&Node<T>>) -> usize
where
    T: Clone + Ord,
{
    node.map_or(0, |node| node.height)
}

fn count<T>(node: Option<&Node<T>>) -> usize
where
    T: Clone + Ord,
{
    node.map_or(0, |node| node.count)
}

fn balance_factor<T>(node: Option<&Node<T>>) -> isize
where
    T: Clone + Ord,
{
    node.map_or(0, |node| node.balance_factor())
}

/// In-order iterator over values of [`OrderedTree`].
pub struct Iter<'a, T>
where
    T: Clone + Ord,
{
    stack: Vec<&'a Node<T>>,
    remaining: usize,
}

impl<'a, T> Iter<'a, T>
where
    T: Clone + Ord,
{
    fn new(root: Option<&'a Node<T>>, remaining: usize) -> Iter<'a, T> {
        let mut iter = Iter {
            stack: vec![],
            remaining,
        };
        iter.push_left(root);
        iter
    }

    fn push_left(&mut self, mut node: Option<&'a Node<T>>) {
        while let Some(nref) = node {
            self.stack.push(nref);
            node = nref.left_deref();
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T>
where
    T: Clone + Ord,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left(node.right_deref());
        self.remaining -= 1;
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> where T: Clone + Ord {}

/// Node corresponds to a single value in OrderedTree instance.
#[derive(Clone)]
struct Node<T>
where
    T: Clone + Ord,
{
    value: T,
    count: usize,                // store: number of nodes in this subtree
    height: usize,               // store: longest path to a leaf, leaf is 1
    left: Option<Box<Node<T>>>,  // store: left child
    right: Option<Box<Node<T>>>, // store: right child
}

// Primary operations on a single node.
impl<T> Node<T>
where
    T: Clone + Ord,
{
    // CREATE operation
    fn new(value: T) -> Box<Node<T>> {
        Box::new(Node {
            value,
            count: 1,
            height: 1,
            left: None,
            right: None,
        })
    }

    #[inline]
    fn left_deref(&self) -> Option<&Node<T>> {
        self.left.as_ref().map(Deref::deref)
    }

    #[inline]
    fn right_deref(&self) -> Option<&Node<T>> {
        self.right.as_ref().map(Deref::deref)
    }

    #[inline]
    fn left_count(&self) -> usize {
        count(self.left_deref())
    }

    #[inline]
    fn balance_factor(&self) -> isize {
        height(self.left_deref()) as isize - height(self.right_deref()) as isize
    }

    // recompute aggregates from children, children must be up to date.
    #[inline]
    fn update(&mut self) {
        let (left, right) = (self.left_deref(), self.right_deref());
        let n = count(left) + count(right) + 1;
        let h = cmp::max(height(left), height(right)) + 1;
        self.count = n;
        self.height = h;
    }
}

/// Statistics on [`OrderedTree`]. Serves two purpose:
///
/// * To get partial but quick statistics via [`OrderedTree::stats`] method.
/// * To get full statisics via [`OrderedTree::validate`] method.
#[derive(Default, Debug)]
pub struct Stats {
    entries: usize, // number of entries in the tree.
    node_size: usize,
    height: usize,
    depths: Option<Depth>,
}

impl Stats {
    fn new(entries: usize, node_size: usize, height: usize) -> Stats {
        Stats {
            entries,
            node_size,
            height,
            depths: Default::default(),
        }
    }

    #[inline]
    fn set_depths(&mut self, depths: Depth) {
        self.depths = Some(depths)
    }

    /// Return number entries in [`OrderedTree`] instance.
    #[inline]
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Return node-size, including over-head for `OrderedTree<T>`. The
    /// overhead is constant, the node size varies with the value type.
    /// EG:
    ///
    /// ```
    /// use avl_index::OrderedTree;
    /// let tree: OrderedTree<u64> = OrderedTree::new("myinstance");
    ///
    /// // size of value: 8 bytes
    /// // overhead is 32 bytes
    /// assert_eq!(tree.stats().node_size(), 40);
    /// ```
    #[inline]
    pub fn node_size(&self) -> usize {
        self.node_size
    }

    /// Return the tree height, number of nodes on the longest path from
    /// root to leaf.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Return [`Depth`] statistics, available only from validate().
    pub fn depths(&self) -> Option<Depth> {
        match self.depths.as_ref() {
            Some(depths) if depths.samples() > 0 => Some(depths.clone()),
            _ => None,
        }
    }
}
