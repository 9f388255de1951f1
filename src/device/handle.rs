use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Marker for buffer handles.
#[derive(Debug)]
pub enum Buffer {}

/// Marker for texture handles.
#[derive(Debug)]
pub enum Texture {}

/// Marker for shader pipeline handles.
#[derive(Debug)]
pub enum Shader {}

pub type BufferHandle = Handle<Buffer>;
pub type TextureHandle = Handle<Texture>;
pub type ShaderHandle = Handle<Shader>;

/// Typed, copyable reference to a resource owned by a [`GraphicsDevice`].
///
/// Devices hand out indices monotonically and never recycle them, so a handle
/// to a destroyed resource stays invalid forever instead of aliasing a newer one.
///
/// [`GraphicsDevice`]: crate::device::GraphicsDevice
pub struct Handle<T> {
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

// Manual impls: the marker types carry no data, so no bounds on T.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = std::any::type_name::<T>().rsplit("::").next().unwrap_or("?");
        write!(f, "{kind}#{}", self.index)
    }
}

impl<T> Handle<T> {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// Hands out fresh handle indices; never rewinds.
#[derive(Debug, Default)]
pub(crate) struct HandleAllocator {
    next: usize,
}

impl HandleAllocator {
    pub(crate) fn allocate<T>(&mut self) -> Handle<T> {
        let handle = Handle::new(self.next);
        self.next += 1;
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_is_copy() {
        let h1: BufferHandle = Handle::new(5);
        let h2 = h1;
        let h3 = h1;
        assert_eq!(h1.index(), h2.index());
        assert_eq!(h1, h3);
    }

    #[test]
    fn allocator_never_reuses_indices() {
        let mut alloc = HandleAllocator::default();
        let a: TextureHandle = alloc.allocate();
        let b: TextureHandle = alloc.allocate();
        let c: BufferHandle = alloc.allocate();
        assert_ne!(a, b);
        assert_eq!(c.index(), 2);
    }

    #[test]
    fn debug_names_the_resource_kind() {
        let h: ShaderHandle = Handle::new(3);
        assert_eq!(format!("{h:?}"), "Shader#3");
    }
}
