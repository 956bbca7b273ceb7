pub(crate) mod meta;
pub(crate) mod migrate;
pub(crate) mod output;
pub(crate) mod shared;
pub(crate) mod status;

#[cfg(feature = "github")]
pub(crate) mod limits;

#[cfg(feature = "github")]
pub(crate) mod refresh;

#[cfg(feature = "github")]
pub(crate) mod run;

#[cfg(feature = "github")]
pub(crate) mod sync;
