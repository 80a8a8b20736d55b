use std::any::Any;
use std::cell::RefCell;
use thread_local::ThreadLocal;

/// Scratch storage holding type-erased buffers.
///
/// Each buffer type is stored at most once. Lookups search from the back, where the most recently
/// used buffer is kept.
#[derive(Debug, Default)]
pub struct Workspace {
    buffers: Vec<Box<dyn Any + Send>>,
}

impl Workspace {
    pub fn get_or_insert_with<W, F>(&mut self, create: F) -> &mut W
    where
        W: 'static + Send,
        F: FnOnce() -> W,
    {
        match self.buffers.iter().rposition(|buffer| buffer.is::<W>()) {
            Some(idx) => {
                let last = self.buffers.len() - 1;
                self.buffers.swap(idx, last);
            }
            None => self.buffers.push(Box::new(create())),
        }

        self.buffers
            .last_mut()
            .and_then(|buffer| buffer.downcast_mut())
            .expect("Internal error: the last buffer always has the requested type")
    }

    pub fn get_or_default<W>(&mut self) -> &mut W
    where
        W: 'static + Send + Default,
    {
        self.get_or_insert_with(Default::default)
    }
}

/// Runs `f` with the calling thread's buffer of type `W` from the given per-thread workspaces.
///
/// # Panics
///
/// Panics if the calling thread's workspace is already borrowed, i.e. if `f` re-enters this
/// function with the same workspaces.
pub fn with_thread_local_workspace<W, R, F>(workspaces: &ThreadLocal<RefCell<Workspace>>, f: F) -> R
where
    W: 'static + Send + Default,
    F: FnOnce(&mut W) -> R,
{
    let mut workspace = workspaces.get_or_default().borrow_mut();
    f(workspace.get_or_default())
}
