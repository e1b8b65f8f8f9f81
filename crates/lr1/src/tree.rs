//! Concrete parse trees.

use crate::{grammar::Symbol, util::display_fn};
use std::{
    cell::OnceCell,
    fmt, ptr,
    rc::{Rc, Weak},
};

/// A node of a parse tree.
///
/// Leaves are the input tokens and carry an optional payload. Internal
/// nodes are created by reductions; a nonterminal without children is the
/// result of an empty derivation.
#[derive(Debug)]
pub struct TreeNode<T = ()> {
    symbol: Symbol,
    parent: OnceCell<Weak<TreeNode<T>>>,
    children: Vec<Rc<TreeNode<T>>>,
    payload: Option<T>,
}

impl<T> TreeNode<T> {
    pub fn leaf(symbol: Symbol) -> Self {
        Self {
            symbol,
            parent: OnceCell::new(),
            children: vec![],
            payload: None,
        }
    }

    pub fn with_payload(symbol: Symbol, payload: T) -> Self {
        Self {
            payload: Some(payload),
            ..Self::leaf(symbol)
        }
    }

    /// Create an internal node and attach `children` to it.
    pub(crate) fn branch(symbol: Symbol, children: Vec<Rc<TreeNode<T>>>) -> Rc<Self> {
        Rc::new_cyclic(|me| {
            for child in &children {
                // a child is attached once, by the reduction consuming it
                let _ = child.parent.set(me.clone());
            }
            Self {
                symbol,
                parent: OnceCell::new(),
                children,
                payload: None,
            }
        })
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn children(&self) -> &[Rc<TreeNode<T>>] {
        &self.children[..]
    }

    pub fn parent(&self) -> Option<Rc<TreeNode<T>>> {
        self.parent.get().and_then(Weak::upgrade)
    }

    pub fn payload(&self) -> Option<&T> {
        self.payload.as_ref()
    }

    pub fn is_leaf(&self) -> bool {
        self.symbol.is_terminal()
    }

    /// Whether this node is a nonterminal derived to the empty string.
    pub fn is_nulled(&self) -> bool {
        self.symbol.is_nonterminal() && self.children.is_empty()
    }

    fn is_last_child(&self) -> bool {
        match self.parent() {
            Some(parent) => parent
                .children
                .last()
                .map_or(false, |last| ptr::eq(Rc::as_ptr(last), self)),
            None => true,
        }
    }

    /// Render the tree one node per line, with guides to the ancestors.
    ///
    /// ```text
    /// S
    ///  |- A => null
    ///  `- B
    ///      `- b
    /// ```
    pub fn display_layered(&self) -> impl fmt::Display + '_ {
        display_fn(move |f| write_layered(f, self, 0))
    }

    /// Render the tree as `S(A(a) b)`; nonterminals always get parentheses.
    pub fn display_flat(&self) -> impl fmt::Display + '_ {
        display_fn(move |f| write_flat(f, self))
    }

    /// Render only the terminals, bracketing every nonterminal with more
    /// than one non-empty child, e.g. `((a a) b)`.
    pub fn display_simple(&self) -> impl fmt::Display + '_ {
        display_fn(move |f| f.write_str(&simple(self)))
    }
}

fn write_layered<T>(f: &mut fmt::Formatter<'_>, node: &TreeNode<T>, depth: usize) -> fmt::Result {
    if depth == 0 {
        f.write_str(node.symbol.name())?;
    } else {
        // guides for the ancestors between the rendered root and this node
        let mut guides = vec![];
        let mut ancestor = node.parent();
        for _ in 1..depth {
            let Some(current) = ancestor else { break };
            guides.push(if current.is_last_child() { "    " } else { " |  " });
            ancestor = current.parent();
        }
        for guide in guides.iter().rev() {
            f.write_str(guide)?;
        }
        let branch = if node.is_last_child() { " `- " } else { " |- " };
        write!(f, "{}{}", branch, node.symbol.name())?;
        if node.is_nulled() {
            f.write_str(" => null")?;
        }
    }
    for child in &node.children {
        writeln!(f)?;
        write_layered(f, child, depth + 1)?;
    }
    Ok(())
}

fn write_flat<T>(f: &mut fmt::Formatter<'_>, node: &TreeNode<T>) -> fmt::Result {
    f.write_str(node.symbol.name())?;
    if node.symbol.is_nonterminal() {
        f.write_str("(")?;
        for (i, child) in node.children.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write_flat(f, child)?;
        }
        f.write_str(")")?;
    }
    Ok(())
}

fn simple<T>(node: &TreeNode<T>) -> String {
    if node.symbol.is_terminal() {
        return node.symbol.name().to_owned();
    }
    let parts: Vec<String> = node
        .children
        .iter()
        .map(|child| simple(child))
        .filter(|part| !part.is_empty())
        .collect();
    match parts.len() {
        0 => String::new(),
        1 => parts.into_iter().next().unwrap_or_default(),
        _ => format!("({})", parts.join(" ")),
    }
}
