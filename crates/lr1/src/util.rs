use std::fmt;

/// A formatting closure usable wherever a `Display` value is expected.
pub struct DisplayFn<F>(F);

impl<F> fmt::Display for DisplayFn<F>
where
    F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (self.0)(f)
    }
}

pub fn display_fn<F>(f: F) -> DisplayFn<F>
where
    F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
{
    DisplayFn(f)
}

/// Join the displayed items with `sep`.
pub fn join<'a, T>(items: &'a [T], sep: &'a str) -> impl fmt::Display + 'a
where
    T: fmt::Display,
{
    display_fn(move |f| {
        let mut items = items.iter();
        if let Some(first) = items.next() {
            write!(f, "{}", first)?;
        }
        items.try_for_each(|item| write!(f, "{}{}", sep, item))
    })
}
