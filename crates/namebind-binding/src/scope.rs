//! Request-scoped local dtab, carried through a call tree without
//! threading an explicit parameter through every `acquire`.
//!
//! `ServiceFactory::acquire` takes only `conn` (spec.md §6's downstream
//! factory interface), so the request-scoped half of `effective = base()
//! ++ local` (spec.md §4.4) has nowhere else to live. A task-local
//! mirrors how the delegation table is scoped in the system this is
//! modeled on: ambient for the duration of a call tree, empty by default,
//! overridable for a bounded span via [`with_local_dtab`].

use std::future::Future;

use namebind_core::Dtab;

tokio::task_local! {
    static LOCAL_DTAB: Dtab;
}

/// Runs `fut` with `dtab` installed as the request-scoped local dtab for
/// its entire call tree, restoring whatever was in scope beforehand once
/// `fut` completes.
pub async fn with_local_dtab<F: Future>(dtab: Dtab, fut: F) -> F::Output {
    LOCAL_DTAB.scope(dtab, fut).await
}

/// The local dtab currently in scope, or [`Dtab::empty`] outside of a
/// [`with_local_dtab`] span.
pub fn current_local_dtab() -> Dtab {
    LOCAL_DTAB.try_with(Clone::clone).unwrap_or_else(|_| Dtab::empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn defaults_to_empty_outside_any_scope() {
        assert!(current_local_dtab().is_empty());
    }

    #[tokio::test]
    async fn reflects_the_dtab_installed_by_with_local_dtab() {
        let local = Dtab::read("/s/users=>/s/users-canary").unwrap();
        let seen = with_local_dtab(local.clone(), async { current_local_dtab() }).await;
        assert_eq!(seen, local);
        assert!(current_local_dtab().is_empty());
    }

    #[tokio::test]
    async fn nested_scopes_restore_the_outer_dtab_on_exit() {
        let outer = Dtab::read("/a=>/b").unwrap();
        let inner = Dtab::read("/c=>/d").unwrap();

        with_local_dtab(outer.clone(), async {
            assert_eq!(current_local_dtab(), outer);
            let seen_inner = with_local_dtab(inner.clone(), async { current_local_dtab() }).await;
            assert_eq!(seen_inner, inner);
            assert_eq!(current_local_dtab(), outer);
        })
        .await;
    }
}
