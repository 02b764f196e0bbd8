//! Name-based selection of preconditioners and linear solvers.
//!
//! Configuration carries solver choices as short strings. Parsing is strict
//! ([`FromStr`]); drivers fall back to [`PreconditionerKind::None`] and
//! [`LinearSolverKind::Richardson`] through [`select_lenient`] unless strict
//! selection is requested.

use std::fmt;
use std::str::FromStr;

use super::error::UnknownSelector;
use super::krylov::{BiCgStab, Gmres, LinearSolver, Richardson};
use super::preconditioner::{BlockIlu0, BlockJacobi, BlockSgs, NoPreconditioner, Preconditioner};

/// Default GMRES restart length.
pub const DEFAULT_RESTART: usize = 30;

/// Preconditioner choice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PreconditionerKind {
    #[default]
    None,
    Jacobi,
    Sgs,
    Ilu0,
}

impl FromStr for PreconditionerKind {
    type Err = UnknownSelector;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "J" | "jacobi" | "Jacobi" => Ok(Self::Jacobi),
            "SGS" | "sgs" => Ok(Self::Sgs),
            "ILU0" | "ilu0" => Ok(Self::Ilu0),
            "NONE" | "none" => Ok(Self::None),
            _ => Err(UnknownSelector {
                kind: "preconditioner",
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for PreconditionerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Jacobi => "J",
            Self::Sgs => "SGS",
            Self::Ilu0 => "ILU0",
        };
        f.write_str(s)
    }
}

impl PreconditionerKind {
    /// Build a preconditioner of this kind.
    pub fn create<const N: usize>(self) -> Box<dyn Preconditioner<N>> {
        match self {
            Self::None => Box::new(NoPreconditioner),
            Self::Jacobi => Box::new(BlockJacobi::<N>::new()),
            Self::Sgs => Box::new(BlockSgs::<N>::new()),
            Self::Ilu0 => Box::new(BlockIlu0::<N>::new()),
        }
    }
}

/// Krylov (or stationary) linear solver choice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LinearSolverKind {
    #[default]
    Richardson,
    BiCgStab,
    Gmres,
}

impl FromStr for LinearSolverKind {
    type Err = UnknownSelector;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BCGSTB" | "bicgstab" | "BiCGStab" => Ok(Self::BiCgStab),
            "GMRES" | "gmres" => Ok(Self::Gmres),
            "RICHARDSON" | "richardson" => Ok(Self::Richardson),
            _ => Err(UnknownSelector {
                kind: "linear solver",
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for LinearSolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Richardson => "richardson",
            Self::BiCgStab => "BCGSTB",
            Self::Gmres => "GMRES",
        };
        f.write_str(s)
    }
}

impl LinearSolverKind {
    /// Build a linear solver of this kind around a preconditioner.
    ///
    /// `restart` is only used by GMRES.
    pub fn create<const N: usize>(
        self,
        precond: Box<dyn Preconditioner<N>>,
        restart: usize,
    ) -> Box<dyn LinearSolver<N>> {
        match self {
            Self::Richardson => Box::new(Richardson::new(precond)),
            Self::BiCgStab => Box::new(BiCgStab::new(precond)),
            Self::Gmres => Box::new(Gmres::new(precond, restart)),
        }
    }
}

/// Parse `name`, or fall back to `T::default()` with a log line.
pub fn select_lenient<T>(name: &str) -> T
where
    T: FromStr<Err = UnknownSelector> + Default + fmt::Display,
{
    match name.parse() {
        Ok(kind) => kind,
        Err(e) => {
            let fallback = T::default();
            log::warn!("{e}, using '{fallback}'");
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_short_names() {
        assert_eq!("J".parse::<PreconditionerKind>(), Ok(PreconditionerKind::Jacobi));
        assert_eq!("SGS".parse::<PreconditionerKind>(), Ok(PreconditionerKind::Sgs));
        assert_eq!("ILU0".parse::<PreconditionerKind>(), Ok(PreconditionerKind::Ilu0));
        assert_eq!("BCGSTB".parse::<LinearSolverKind>(), Ok(LinearSolverKind::BiCgStab));
        assert_eq!("GMRES".parse::<LinearSolverKind>(), Ok(LinearSolverKind::Gmres));
    }

    #[test]
    fn test_strict_parse_rejects_unknown() {
        let err = "AMG".parse::<PreconditionerKind>().unwrap_err();
        assert_eq!(err.kind, "preconditioner");
        assert_eq!(err.name, "AMG");
        assert!("CG".parse::<LinearSolverKind>().is_err());
    }

    #[test]
    fn test_lenient_falls_back() {
        let p: PreconditionerKind = select_lenient("AMG");
        let s: LinearSolverKind = select_lenient("CG");
        assert_eq!(p, PreconditionerKind::None);
        assert_eq!(s, LinearSolverKind::Richardson);

        let p: PreconditionerKind = select_lenient("ILU0");
        assert_eq!(p, PreconditionerKind::Ilu0);
    }

    #[test]
    fn test_display_roundtrips_through_parse() {
        for k in [
            PreconditionerKind::None,
            PreconditionerKind::Jacobi,
            PreconditionerKind::Sgs,
            PreconditionerKind::Ilu0,
        ] {
            assert_eq!(k.to_string().parse::<PreconditionerKind>(), Ok(k));
        }
    }

    #[test]
    fn test_factory_names() {
        let p = PreconditionerKind::Sgs.create::<2>();
        assert_eq!(p.name(), "block-sgs");
        let s = LinearSolverKind::Gmres.create::<2>(p, DEFAULT_RESTART);
        assert_eq!(s.name(), "gmres");
    }
}
