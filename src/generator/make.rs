//! Make backend: renders an [`EmitPlan`] as a Makefile.
//!
//! Recipe command lines are indented with a tab character; that
//! indentation is Make syntax, not style, and must never be normalized to
//! spaces.

use crate::generator::plan::{AppPlan, CompileEdge, EmitPlan, LibraryPlan};

/// Render the complete Makefile text.
pub fn render(plan: &EmitPlan) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "# Generated by {} on {}\n\n",
        plan.banner, plan.timestamp
    ));
    out.push_str("default: all\n\n");

    render_variables(&mut out, plan);
    render_verbosity_block(&mut out);

    for lib in &plan.libs {
        render_library(&mut out, lib);
    }
    for app in &plan.apps {
        render_application(&mut out, app);
    }
    render_targets(&mut out, plan);

    out
}

fn render_variables(out: &mut String, plan: &EmitPlan) {
    out.push_str("# variables\n\n");
    for var in &plan.vars {
        if !var.desc.is_empty() {
            out.push_str(&format!("# {}\n", var.desc));
        }
        out.push_str(&format!("{} = {}\n", var.name, var.value));
    }
    out.push('\n');
}

/// The `V=1` verbosity switch: quiet builds prefix every command with `@`.
fn render_verbosity_block(out: &mut String) {
    out.push_str(
        "ifneq ($(V), )\n\
         \tVERBOSE_BUILD = $(V)\n\
         else\n\
         \tVERBOSE_BUILD = 0\n\
         endif\n\
         \n\
         ifeq ($(VERBOSE_BUILD),1)\n\
         \tQUIET =\n\
         \tQ =\n\
         \tVERBOSE = v\n\
         else\n\
         \tQUIET = quiet\n\
         \tQ = @\n\
         \tVERBOSE =\n\
         endif\n\n",
    );
}

/// Make variable holding a module's object list.
fn objs_var(module: &str) -> String {
    format!("{}_OBJS", module.replace(['-', '.'], "_"))
}

fn render_object_list(out: &mut String, module: &str, compiles: &[CompileEdge]) {
    if compiles.is_empty() {
        out.push_str(&format!("{} =\n\n", objs_var(module)));
        return;
    }
    out.push_str(&format!("{} = \\\n", objs_var(module)));
    for (i, edge) in compiles.iter().enumerate() {
        let sep = if i + 1 == compiles.len() { "\n" } else { " \\\n" };
        out.push_str(&format!("\t$(PRJ_PATH)/{}{}", edge.object, sep));
    }
    out.push('\n');
}

fn render_compile_recipe(out: &mut String, edge: &CompileEdge) {
    let mut flags = edge.flags.clone();
    for dir in &edge.include_dirs {
        flags.push_str(&format!(" -I$(SRC_PATH)/{dir}"));
    }

    out.push_str(&format!(
        "$(PRJ_PATH)/{obj}: $(SRC_PATH)/{src}\n\
         \t@mkdir -p $(@D)\n\
         \t$(Q){cc} -MMD -MF $@.d -c $< -o $@{flags}\n\n",
        obj = edge.object,
        src = edge.source,
        cc = edge.lang.make_compiler(),
        flags = leading_space(&flags),
    ));
}

fn render_library(out: &mut String, lib: &LibraryPlan) {
    out.push_str(&format!("# library {}{}\n\n", lib.name, desc_suffix(&lib.desc)));

    render_object_list(out, &lib.name, &lib.compiles);
    for edge in &lib.compiles {
        render_compile_recipe(out, edge);
    }

    let objs = objs_var(&lib.name);
    out.push_str(&format!(
        "$(PRJ_PATH)/{archive}: $({objs})\n\
         \t@mkdir -p $(@D)\n\
         \t$(Q)$(AR) crs $@ $^\n\n",
        archive = lib.archive,
    ));

    out.push_str(&format!("{}: $(PRJ_PATH)/{}\n\n", lib.name, lib.archive));
    out.push_str(&format!("-include $({objs}:%.o=%.o.d)\n\n"));
}

fn render_application(out: &mut String, app: &AppPlan) {
    out.push_str(&format!(
        "# application {}{}\n\n",
        app.name,
        desc_suffix(&app.desc)
    ));

    render_object_list(out, &app.name, &app.compiles);
    for edge in &app.compiles {
        render_compile_recipe(out, edge);
    }

    let objs = objs_var(&app.name);
    let linker = if app.use_cxx_linker { "$(CXX)" } else { "$(CC)" };

    let mut link_flags = String::new();
    for lib in &app.libs {
        link_flags.push_str(&format!(" -l{lib}"));
    }
    if !app.linkflags.is_empty() {
        link_flags.push_str(&format!(" {}", app.linkflags));
    }

    let archives: String = app
        .archives
        .iter()
        .map(|a| format!(" $(PRJ_PATH)/{a}"))
        .collect();

    out.push_str(&format!(
        "$(PRJ_PATH)/{output}: $({objs}){archives}\n\
         \t@mkdir -p $(@D)\n\
         \t$(Q){linker} -o $@ $({objs}) -L$(PRJ_PATH)/libs{link_flags}\n\n",
        output = app.output,
    ));

    out.push_str(&format!("{}: $(PRJ_PATH)/{}\n\n", app.name, app.output));
    out.push_str(&format!("-include $({objs}:%.o=%.o.d)\n\n"));
}

fn render_targets(out: &mut String, plan: &EmitPlan) {
    for target in &plan.targets {
        out.push_str(&format!(
            "# target {}{}\n\n",
            target.name,
            desc_suffix(&target.desc)
        ));

        out.push_str(&target.name);
        out.push(':');
        for dep in &target.deps {
            out.push_str(&format!(" {dep}"));
        }
        out.push('\n');
        if !target.command.is_empty() {
            out.push_str(&format!("\t$(Q){}\n", target.command));
        }
        out.push('\n');
    }

    // Entity aliases are phony too: a stray file named after a library or
    // application must not satisfy its alias rule.
    let names: Vec<&str> = plan
        .libs
        .iter()
        .map(|l| l.name.as_str())
        .chain(plan.apps.iter().map(|a| a.name.as_str()))
        .chain(plan.targets.iter().map(|t| t.name.as_str()))
        .collect();
    if !names.is_empty() {
        out.push_str(&format!(".PHONY: {}\n", names.join(" ")));
    }
}

fn desc_suffix(desc: &str) -> String {
    if desc.is_empty() {
        String::new()
    } else {
        format!(": {desc}")
    }
}

fn leading_space(flags: &str) -> String {
    if flags.is_empty() {
        String::new()
    } else {
        format!(" {}", flags.trim_start())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::plan::{CommandEdge, SourceLang, VarBinding};

    fn edge(module: &str, source: &str, object: &str, flags: &str) -> CompileEdge {
        CompileEdge {
            module: module.to_string(),
            source: source.to_string(),
            object: object.to_string(),
            lang: SourceLang::C,
            flags: flags.to_string(),
            include_dirs: vec![],
        }
    }

    fn empty_plan() -> EmitPlan {
        EmitPlan {
            banner: "buildgen 0.0".to_string(),
            timestamp: "now".to_string(),
            vars: vec![],
            libs: vec![],
            apps: vec![],
            targets: vec![],
        }
    }

    #[test]
    fn test_header_and_default_target() {
        let text = render(&empty_plan());
        assert!(text.starts_with("# Generated by buildgen 0.0 on now\n"));
        assert!(text.contains("default: all\n"));
    }

    #[test]
    fn test_variables_rendered_as_assignments() {
        let mut plan = empty_plan();
        plan.vars.push(VarBinding {
            name: "SRC_PATH".to_string(),
            value: "/src".to_string(),
            desc: "source code path".to_string(),
        });

        let text = render(&plan);
        assert!(text.contains("# source code path\nSRC_PATH = /src\n"));
    }

    #[test]
    fn test_verbosity_toggle_block() {
        let text = render(&empty_plan());
        assert!(text.contains("ifeq ($(VERBOSE_BUILD),1)"));
        assert!(text.contains("\tQ = @\n"));
    }

    #[test]
    fn test_recipe_lines_are_tab_indented() {
        let mut plan = empty_plan();
        plan.libs.push(LibraryPlan {
            name: "m".to_string(),
            desc: String::new(),
            compiles: vec![edge("m", "a.c", "objs/m/a.o", "-O2")],
            archive: "libs/libm.a".to_string(),
        });

        let text = render(&plan);
        // Tab is load-bearing Make syntax.
        assert!(text.contains("\t$(Q)$(CC) -MMD -MF $@.d -c $< -o $@ -O2\n"));
        assert!(!text.contains("\n    $(Q)$(CC)"));
        assert!(text.contains("$(PRJ_PATH)/objs/m/a.o: $(SRC_PATH)/a.c\n"));
        assert!(text.contains("\t$(Q)$(AR) crs $@ $^\n"));
        assert!(text.contains("m: $(PRJ_PATH)/libs/libm.a\n"));
    }

    #[test]
    fn test_include_dirs_use_src_path() {
        let mut plan = empty_plan();
        let mut e = edge("m", "a.c", "objs/m/a.o", "-O2");
        e.include_dirs = vec!["include".to_string()];
        plan.libs.push(LibraryPlan {
            name: "m".to_string(),
            desc: String::new(),
            compiles: vec![e],
            archive: "libs/libm.a".to_string(),
        });

        let text = render(&plan);
        assert!(text.contains("-O2 -I$(SRC_PATH)/include\n"));
    }

    #[test]
    fn test_application_links_against_libraries() {
        let mut plan = empty_plan();
        plan.apps.push(AppPlan {
            name: "b".to_string(),
            desc: String::new(),
            compiles: vec![edge("b", "b.c", "objs/b/b.o", "")],
            output: "apps/b".to_string(),
            libs: vec!["m".to_string()],
            archives: vec!["libs/libm.a".to_string()],
            linkflags: "-lm".to_string(),
            use_cxx_linker: false,
        });

        let text = render(&plan);
        // Archive is a prerequisite and the library is linked with -l.
        assert!(text.contains("$(PRJ_PATH)/apps/b: $(b_OBJS) $(PRJ_PATH)/libs/libm.a\n"));
        assert!(text.contains("-L$(PRJ_PATH)/libs -lm -lm\n"));
    }

    #[test]
    fn test_targets_and_phony_list() {
        let mut plan = empty_plan();
        plan.targets.push(CommandEdge {
            name: "all".to_string(),
            desc: "Build all applications and libraries".to_string(),
            command: String::new(),
            deps: vec!["m".to_string(), "b".to_string()],
        });
        plan.targets.push(CommandEdge {
            name: "clean".to_string(),
            desc: "Clean all generated files".to_string(),
            command: "rm -rf /prj/objs".to_string(),
            deps: vec![],
        });

        let text = render(&plan);
        assert!(text.contains("all: m b\n"));
        assert!(text.contains("clean:\n\t$(Q)rm -rf /prj/objs\n"));
        assert!(text.contains(".PHONY: all clean\n"));
    }

    #[test]
    fn test_phony_covers_entity_aliases() {
        let mut plan = empty_plan();
        plan.libs.push(LibraryPlan {
            name: "m".to_string(),
            desc: String::new(),
            compiles: vec![],
            archive: "libs/libm.a".to_string(),
        });
        plan.apps.push(AppPlan {
            name: "b".to_string(),
            desc: String::new(),
            compiles: vec![],
            output: "apps/b".to_string(),
            libs: vec![],
            archives: vec![],
            linkflags: String::new(),
            use_cxx_linker: false,
        });
        plan.targets.push(CommandEdge {
            name: "all".to_string(),
            desc: String::new(),
            command: String::new(),
            deps: vec!["m".to_string(), "b".to_string()],
        });

        // Aliases first, then targets; a stray file named `m` or `b` must
        // not shadow the alias rules.
        assert!(render(&plan).contains(".PHONY: m b all\n"));
    }
}
