use std::{collections::HashMap, fmt, hash::Hash, marker::PhantomData, num::NonZeroU32, rc::Rc};

/// A handle to some interned value of type `T`. To retrieve a `&T`, use
/// [`Interner::get`].
pub struct Interned<T: ?Sized> {
    // NonZeroU32 keeps `Option<Interned<T>>` the size of a `u32`.
    handle: NonZeroU32,
    _ty: PhantomData<T>,
}

impl<T: ?Sized> Interned<T> {
    pub(crate) const fn unchecked_new(handle: NonZeroU32) -> Self {
        Interned {
            handle,
            _ty: PhantomData,
        }
    }

    /// Zero-based position of the value in interning order.
    pub const fn index(self) -> u32 {
        self.handle.get() - 1
    }
}

impl<T: ?Sized> Copy for Interned<T> {}

impl<T: ?Sized> Clone for Interned<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Hash for Interned<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
    }
}

impl<T: ?Sized> PartialEq for Interned<T> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl<T: ?Sized> Eq for Interned<T> {}

impl<T: ?Sized> fmt::Debug for Interned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Interned({})", self.handle)
    }
}

impl<T: ?Sized> From<&Interned<T>> for Interned<T> {
    fn from(value: &Interned<T>) -> Self {
        *value
    }
}

pub struct Interner<T: ?Sized> {
    map: HashMap<Rc<T>, NonZeroU32>,
    vec: Vec<Rc<T>>,
}

impl fmt::Debug for Interner<str> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (handle, interned) in self.iter() {
            map.entry(&handle.index(), &interned);
        }
        map.finish()
    }
}

impl<T: ?Sized> Interner<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Interner {
            map: HashMap::with_capacity(capacity),
            vec: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }

    /// Interns the provided value, returning a handle which can be used to
    /// retrieve it later. Interning an equal value twice returns the same
    /// handle.
    pub fn intern(&mut self, value: &T) -> Interned<T>
    where
        T: Eq + Hash,
        T: ToOwned,
        T::Owned: Into<Rc<T>>,
    {
        if let Some(handle) = self.map.get(value) {
            return Interned::unchecked_new(*handle);
        }
        let key: Rc<T> = value.to_owned().into();
        let len = u32::try_from(self.vec.len()).expect("interned out of capacity");
        let handle = NonZeroU32::MIN.saturating_add(len);
        self.vec.push(Rc::clone(&key));
        self.map.insert(key, handle);
        Interned::unchecked_new(handle)
    }

    /// Returns the corresponding value for the provided [`Interned`] handle.
    /// Panics if not found.
    pub fn get(&self, handle: impl Into<Interned<T>>) -> &T {
        let handle: Interned<T> = handle.into();
        &self.vec[handle.index() as usize]
    }

    /// Iterates over every interned value, in interning order.
    pub fn iter(&self) -> impl Iterator<Item = (Interned<T>, &T)> {
        self.vec.iter().zip(1..).map(|(value, i)| {
            let handle = NonZeroU32::new(i).expect("handles start at one");
            (Interned::unchecked_new(handle), &**value)
        })
    }
}
