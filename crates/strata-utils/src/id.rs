// Id { u32 }
#[macro_export]
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
        )]
        pub struct $name {
            id: u32,
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.id)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.id)
            }
        }

        impl $name {
            pub const fn new(id: u32) -> Self {
                Self { id }
            }

            pub fn as_usize(&self) -> usize {
                self.id as usize
            }

            pub fn id(&self) -> u32 {
                self.id
            }
        }

        impl From<u32> for $name {
            fn from(id: u32) -> Self {
                Self::new(id)
            }
        }
    };
}

// Id { u32 } handed out by a process wide counter
#[macro_export]
macro_rules! define_generated_id {
    ($(#[$meta:meta])* $name:ident) => {
        $crate::define_id!($(#[$meta])* $name);

        impl $name {
            /// Returns an id that no other call in this process has returned.
            pub fn fresh() -> Self {
                static GENERATOR: std::sync::atomic::AtomicU32 = std::sync::atomic::AtomicU32::new(0);

                Self::new(GENERATOR.fetch_add(1, std::sync::atomic::Ordering::Relaxed))
            }
        }
    };
}
