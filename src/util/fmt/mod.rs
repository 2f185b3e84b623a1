use crate::context::Context;

pub mod error;
pub mod tree;

/// Analogous to [`std::fmt::Display`], but also receives the compilation
/// [`Context`], so that interned names can be resolved.
pub trait Show {
    fn show(&self, f: &mut std::fmt::Formatter<'_>, ctx: &Context) -> std::fmt::Result;

    /// Returns a type which can be displayed.
    fn display<'a>(&'a self, ctx: &'a Context) -> impl std::fmt::Display + 'a
    where
        Self: Sized,
    {
        Display(self, ctx)
    }
}

struct Display<'this, 'ctx, T: Show>(pub &'this T, pub &'ctx Context);

impl<T> std::fmt::Display for Display<'_, '_, T>
where
    T: Show,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Display(this, ctx) = self;
        this.show(f, ctx)
    }
}
