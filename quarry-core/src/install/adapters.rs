// quarry-core/src/install/adapters.rs
// Builtin install-step planners for the two native build systems the recipe
// corpus shells out to. Both map variants onto flags mechanically: recipes
// needing anything richer register their own planner.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use quarry_common::error::Result;
use quarry_common::model::{ResolvedSpec, VariantValue};

use super::{InstallAction, InstallPlanner};

fn parallel_jobs() -> usize {
    std::cmp::max(1, num_cpus::get())
}

fn joined_paths(dependency_prefixes: &HashMap<String, PathBuf>, suffix: &str) -> String {
    let mut paths: Vec<String> = dependency_prefixes
        .values()
        .map(|p| p.join(suffix).display().to_string())
        .collect();
    paths.sort();
    paths.join(":")
}

/// `./configure && make && make install`, with variants mapped to
/// `--enable-x/--disable-x` and `--with-name=value` switches.
pub struct AutotoolsPlanner;

impl InstallPlanner for AutotoolsPlanner {
    fn plan(
        &self,
        spec: &ResolvedSpec,
        prefix: &Path,
        dependency_prefixes: &HashMap<String, PathBuf>,
    ) -> Result<Vec<InstallAction>> {
        let mut actions = vec![InstallAction::SetEnv {
            key: "CC".to_string(),
            value: spec.toolchain.compiler.cc().to_string(),
        }];

        if !dependency_prefixes.is_empty() {
            actions.push(InstallAction::SetEnv {
                key: "PKG_CONFIG_PATH".to_string(),
                value: joined_paths(dependency_prefixes, "lib/pkgconfig"),
            });
            let mut includes: Vec<String> = dependency_prefixes
                .values()
                .map(|p| format!("-I{}", p.join("include").display()))
                .collect();
            includes.sort();
            actions.push(InstallAction::SetEnv {
                key: "CPPFLAGS".to_string(),
                value: includes.join(" "),
            });
            let mut libs: Vec<String> = dependency_prefixes
                .values()
                .map(|p| format!("-L{}", p.join("lib").display()))
                .collect();
            libs.sort();
            actions.push(InstallAction::SetEnv {
                key: "LDFLAGS".to_string(),
                value: libs.join(" "),
            });
        }

        let mut configure_args = vec![format!("--prefix={}", prefix.display())];
        for (name, value) in &spec.variants {
            let flag = name.replace('_', "-");
            match value {
                VariantValue::Bool(true) => configure_args.push(format!("--enable-{flag}")),
                VariantValue::Bool(false) => configure_args.push(format!("--disable-{flag}")),
                VariantValue::Choice(choice) => {
                    configure_args.push(format!("--with-{flag}={choice}"))
                }
            }
        }

        actions.push(InstallAction::Run {
            program: "./configure".to_string(),
            args: configure_args,
            cwd: None,
        });
        actions.push(InstallAction::Run {
            program: "make".to_string(),
            args: vec![format!("-j{}", parallel_jobs())],
            cwd: None,
        });
        actions.push(InstallAction::Run {
            program: "make".to_string(),
            args: vec!["install".to_string()],
            cwd: None,
        });
        Ok(actions)
    }
}

/// Out-of-source CMake configure/build/install, with variants mapped to
/// `-D` cache entries. The `build_type` variant, when a recipe declares
/// one, becomes `CMAKE_BUILD_TYPE`.
pub struct CmakePlanner;

impl InstallPlanner for CmakePlanner {
    fn plan(
        &self,
        spec: &ResolvedSpec,
        prefix: &Path,
        dependency_prefixes: &HashMap<String, PathBuf>,
    ) -> Result<Vec<InstallAction>> {
        let mut actions = Vec::new();
        if !dependency_prefixes.is_empty() {
            let mut prefixes: Vec<String> = dependency_prefixes
                .values()
                .map(|p| p.display().to_string())
                .collect();
            prefixes.sort();
            actions.push(InstallAction::SetEnv {
                key: "CMAKE_PREFIX_PATH".to_string(),
                value: prefixes.join(":"),
            });
        }

        let mut configure_args = vec![
            "-S".to_string(),
            ".".to_string(),
            "-B".to_string(),
            "build".to_string(),
            format!("-DCMAKE_INSTALL_PREFIX={}", prefix.display()),
            format!("-DCMAKE_C_COMPILER={}", spec.toolchain.compiler.cc()),
        ];
        for (name, value) in &spec.variants {
            match (name.as_str(), value) {
                ("build_type", VariantValue::Choice(choice)) => {
                    configure_args.push(format!("-DCMAKE_BUILD_TYPE={choice}"))
                }
                (_, VariantValue::Bool(enabled)) => configure_args.push(format!(
                    "-D{}={}",
                    name.to_uppercase(),
                    if *enabled { "ON" } else { "OFF" }
                )),
                (_, VariantValue::Choice(choice)) => {
                    configure_args.push(format!("-D{}={choice}", name.to_uppercase()))
                }
            }
        }

        actions.push(InstallAction::Run {
            program: "cmake".to_string(),
            args: configure_args,
            cwd: None,
        });
        actions.push(InstallAction::Run {
            program: "cmake".to_string(),
            args: vec![
                "--build".to_string(),
                "build".to_string(),
                format!("-j{}", parallel_jobs()),
            ],
            cwd: None,
        });
        actions.push(InstallAction::Run {
            program: "cmake".to_string(),
            args: vec!["--install".to_string(), "build".to_string()],
            cwd: None,
        });
        Ok(actions)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use quarry_common::model::recipe::{Recipe, VersionEntry};
    use quarry_common::model::spec::{CompilerFamily, Toolchain};
    use quarry_common::model::Version;

    use super::*;

    fn spec_with_variants(variants: Vec<(&str, VariantValue)>) -> ResolvedSpec {
        let recipe = Arc::new(Recipe {
            name: "demo".to_string(),
            description: None,
            homepage: None,
            installer: "autotools".to_string(),
            versions: vec![VersionEntry {
                version: Version::parse("1.0").unwrap(),
                sha256: "0".repeat(64),
            }],
            variants: Vec::new(),
            dependencies: Vec::new(),
        });
        ResolvedSpec {
            recipe,
            version: Version::parse("1.0").unwrap(),
            variants: variants
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect::<BTreeMap<_, _>>(),
            toolchain: Toolchain::new(CompilerFamily::Clang, "linux"),
        }
    }

    #[test]
    fn test_autotools_variant_flags() {
        let spec = spec_with_variants(vec![
            ("shared", VariantValue::Bool(true)),
            ("static_libs", VariantValue::Bool(false)),
            ("fabrics", VariantValue::Choice("ucx".to_string())),
        ]);
        let actions = AutotoolsPlanner
            .plan(&spec, Path::new("/opt/store/demo/1.0"), &HashMap::new())
            .unwrap();

        let configure = actions
            .iter()
            .find_map(|a| match a {
                InstallAction::Run { program, args, .. } if program == "./configure" => Some(args),
                _ => None,
            })
            .expect("configure action");
        assert!(configure.contains(&"--prefix=/opt/store/demo/1.0".to_string()));
        assert!(configure.contains(&"--enable-shared".to_string()));
        assert!(configure.contains(&"--disable-static-libs".to_string()));
        assert!(configure.contains(&"--with-fabrics=ucx".to_string()));

        // compiler identity flows into the environment
        assert!(actions.contains(&InstallAction::SetEnv {
            key: "CC".to_string(),
            value: "clang".to_string(),
        }));
    }

    #[test]
    fn test_cmake_cache_entries_and_dep_prefixes() {
        let spec = spec_with_variants(vec![
            ("build_type", VariantValue::Choice("Release".to_string())),
            ("ilp64", VariantValue::Bool(true)),
        ]);
        let mut deps = HashMap::new();
        deps.insert("openblas".to_string(), PathBuf::from("/opt/store/openblas/0.3.26"));
        deps.insert("openmpi".to_string(), PathBuf::from("/opt/store/openmpi/4.1.6"));

        let actions = CmakePlanner
            .plan(&spec, Path::new("/opt/store/demo/1.0"), &deps)
            .unwrap();

        assert_eq!(
            actions[0],
            InstallAction::SetEnv {
                key: "CMAKE_PREFIX_PATH".to_string(),
                value: "/opt/store/openblas/0.3.26:/opt/store/openmpi/4.1.6".to_string(),
            }
        );
        let configure = actions
            .iter()
            .find_map(|a| match a {
                InstallAction::Run { program, args, .. } if program == "cmake" => Some(args),
                _ => None,
            })
            .expect("cmake configure action");
        assert!(configure.contains(&"-DCMAKE_BUILD_TYPE=Release".to_string()));
        assert!(configure.contains(&"-DILP64=ON".to_string()));
        // build_type maps to CMAKE_BUILD_TYPE, not a raw cache entry
        assert!(!configure.contains(&"-DBUILD_TYPE=Release".to_string()));
    }
}
