//! Ninja backend: renders an [`EmitPlan`] as a build.ninja file.
//!
//! The prologue consists of five fixed rule templates; everything else is
//! `build` statements with per-edge variable bindings. Every compile edge
//! declares its GCC-style depfile, which is what makes incremental
//! rebuilds correct under this backend.

use crate::generator::plan::{AppPlan, CompileEdge, EmitPlan, LibraryPlan};

/// The fixed rule prologue, emitted verbatim after the variable block.
const RULES: &str = "\
# common rules

rule rule_cmd
    command = $CMD
    description = $DESC

rule rule_mkdir
    command = mkdir -p $out
    description = Creating $out

rule rule_cc
    depfile = $DEP
    deps = gcc
    command = $CC -MMD -MF $DEP -c $in -o $out $FLAGS
    description = '<$MOD>': Compiling $SRC to $OBJ

rule rule_ar
    command = $AR crs $out $in
    description = '<$MOD>': Packaging $out

rule rule_ld
    command = $LD -o $out $in -L$PRJ_PATH/libs $FLAGS
    description = '<$MOD>': Linking $out

";

/// Render the complete build.ninja text.
pub fn render(plan: &EmitPlan) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "# Generated by {} on {}\n\n",
        plan.banner, plan.timestamp
    ));

    out.push_str("# variables\n\n");
    for var in &plan.vars {
        out.push_str(&format!("{} = {}\n", var.name, var.value));
    }
    out.push('\n');

    out.push_str(RULES);

    for lib in &plan.libs {
        render_library(&mut out, lib);
    }
    for app in &plan.apps {
        render_application(&mut out, app);
    }
    render_targets(&mut out, plan);

    out.push_str("default all\n");
    out
}

/// One `rule_mkdir` edge per distinct object directory of a module, in
/// first-use order. Compile edges depend on them order-only.
fn render_object_dirs(out: &mut String, compiles: &[CompileEdge]) {
    let mut seen: Vec<String> = Vec::new();
    for edge in compiles {
        let dir = edge.object_dir();
        if !seen.contains(&dir) {
            out.push_str(&format!("build $PRJ_PATH/{dir}: rule_mkdir\n"));
            seen.push(dir);
        }
    }
    if !seen.is_empty() {
        out.push('\n');
    }
}

fn render_compile_edge(out: &mut String, edge: &CompileEdge) {
    let mut flags = edge.flags.clone();
    for dir in &edge.include_dirs {
        flags.push_str(&format!(" -I$SRC_PATH/{dir}"));
    }

    out.push_str(&format!(
        "build $PRJ_PATH/{obj}: rule_cc $SRC_PATH/{src} || $PRJ_PATH/{dir}\n\
         \x20   CC = {cc}\n\
         \x20   FLAGS = {flags}\n\
         \x20   DEP = $PRJ_PATH/{dep}\n\
         \x20   MOD = {module}\n\
         \x20   SRC = {src}\n\
         \x20   OBJ = {obj_rel}\n\n",
        obj = edge.object,
        src = edge.source,
        dir = edge.object_dir(),
        cc = edge.lang.ninja_compiler(),
        flags = flags.trim(),
        dep = edge.depfile(),
        module = edge.module,
        obj_rel = edge.object,
    ));
}

fn render_library(out: &mut String, lib: &LibraryPlan) {
    out.push_str(&format!("# library {}{}\n\n", lib.name, desc_suffix(&lib.desc)));

    render_object_dirs(out, &lib.compiles);
    for edge in &lib.compiles {
        render_compile_edge(out, edge);
    }

    let objects: Vec<String> = lib
        .compiles
        .iter()
        .map(|c| format!("$PRJ_PATH/{}", c.object))
        .collect();

    out.push_str(&format!(
        "build $PRJ_PATH/{archive}: rule_ar {objects}\n\
         \x20   AR = ar\n\
         \x20   MOD = {name}\n\n",
        archive = lib.archive,
        objects = objects.join(" "),
        name = lib.name,
    ));

    out.push_str(&format!("build {}: phony $PRJ_PATH/{}\n\n", lib.name, lib.archive));
}

fn render_application(out: &mut String, app: &AppPlan) {
    out.push_str(&format!(
        "# application {}{}\n\n",
        app.name,
        desc_suffix(&app.desc)
    ));

    render_object_dirs(out, &app.compiles);
    for edge in &app.compiles {
        render_compile_edge(out, edge);
    }

    let objects: Vec<String> = app
        .compiles
        .iter()
        .map(|c| format!("$PRJ_PATH/{}", c.object))
        .collect();

    let mut flags = String::new();
    for lib in &app.libs {
        flags.push_str(&format!("-l{lib} "));
    }
    flags.push_str(&app.linkflags);

    // Inputs are exactly this application's objects; dependency archives
    // ride along as order-only inputs so they exist before the link runs
    // without forcing object recompilation.
    let mut line = format!(
        "build $PRJ_PATH/{output}: rule_ld {objects}",
        output = app.output,
        objects = objects.join(" "),
    );
    if !app.archives.is_empty() {
        let archives: Vec<String> = app
            .archives
            .iter()
            .map(|a| format!("$PRJ_PATH/{a}"))
            .collect();
        line.push_str(&format!(" || {}", archives.join(" ")));
    }

    out.push_str(&format!(
        "{line}\n\
         \x20   LD = {ld}\n\
         \x20   FLAGS = {flags}\n\
         \x20   MOD = {name}\n\n",
        ld = if app.use_cxx_linker { "g++" } else { "gcc" },
        flags = flags.trim(),
        name = app.name,
    ));

    out.push_str(&format!("build {}: phony $PRJ_PATH/{}\n\n", app.name, app.output));
}

fn render_targets(out: &mut String, plan: &EmitPlan) {
    for target in &plan.targets {
        out.push_str(&format!(
            "# target {}{}\n\n",
            target.name,
            desc_suffix(&target.desc)
        ));

        if target.command.is_empty() {
            out.push_str(&format!(
                "build {}: phony {}\n\n",
                target.name,
                target.deps.join(" ")
            ));
            continue;
        }

        let mut line = format!("build {}: rule_cmd", target.name);
        if !target.deps.is_empty() {
            line.push_str(&format!(" {}", target.deps.join(" ")));
        }
        out.push_str(&format!(
            "{line}\n\
             \x20   CMD = {cmd}\n\
             \x20   DESC = {desc}\n\n",
            cmd = escape(&target.command),
            desc = escape(&target.desc),
        ));
    }
}

fn desc_suffix(desc: &str) -> String {
    if desc.is_empty() {
        String::new()
    } else {
        format!(": {desc}")
    }
}

/// Escape literal `$` in free-text bindings; `$` introduces a ninja
/// variable reference otherwise.
fn escape(text: &str) -> String {
    text.replace('$', "$$")
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
    fn test_fixed_rules_present() {
        let text = render(&empty_plan());
        for rule in ["rule_cmd", "rule_mkdir", "rule_cc", "rule_ar", "rule_ld"] {
            assert!(text.contains(&format!("rule {rule}\n")), "missing {rule}");
        }
        // Compile edges must declare their depfile for incremental
        // correctness.
        assert!(text.contains("    depfile = $DEP\n"));
        assert!(text.contains("    deps = gcc\n"));
    }

    #[test]
    fn test_variables_are_top_level_bindings() {
        let mut plan = empty_plan();
        plan.vars.push(VarBinding {
            name: "PRJ_PATH".to_string(),
            value: "/prj".to_string(),
            desc: String::new(),
        });
        assert!(render(&plan).contains("PRJ_PATH = /prj\n"));
    }

    #[test]
    fn test_compile_edge_bindings() {
        let mut plan = empty_plan();
        plan.libs.push(LibraryPlan {
            name: "m".to_string(),
            desc: String::new(),
            compiles: vec![edge("m", "src/a.c", "objs/m/src/a.o", "-O2")],
            archive: "libs/libm.a".to_string(),
        });

        let text = render(&plan);
        assert!(text.contains(
            "build $PRJ_PATH/objs/m/src/a.o: rule_cc $SRC_PATH/src/a.c || $PRJ_PATH/objs/m/src\n"
        ));
        assert!(text.contains("    CC = gcc\n"));
        assert!(text.contains("    FLAGS = -O2\n"));
        assert!(text.contains("    DEP = $PRJ_PATH/objs/m/src/a.o.d\n"));
        assert!(text.contains("    MOD = m\n"));
        assert!(text.contains("    SRC = src/a.c\n"));
        assert!(text.contains("    OBJ = objs/m/src/a.o\n"));
        assert!(text.contains("build $PRJ_PATH/objs/m/src: rule_mkdir\n"));
    }

    #[test]
    fn test_archive_edge_inputs_are_objects() {
        let mut plan = empty_plan();
        plan.libs.push(LibraryPlan {
            name: "m".to_string(),
            desc: String::new(),
            compiles: vec![
                edge("m", "a.c", "objs/m/a.o", ""),
                edge("m", "b.c", "objs/m/b.o", ""),
            ],
            archive: "libs/libm.a".to_string(),
        });

        let text = render(&plan);
        assert!(text.contains(
            "build $PRJ_PATH/libs/libm.a: rule_ar $PRJ_PATH/objs/m/a.o $PRJ_PATH/objs/m/b.o\n"
        ));
        assert!(text.contains("build m: phony $PRJ_PATH/libs/libm.a\n"));
    }

    #[test]
    fn test_link_edge_archives_are_order_only() {
        let mut plan = empty_plan();
        plan.apps.push(AppPlan {
            name: "b".to_string(),
            desc: String::new(),
            compiles: vec![edge("b", "b.c", "objs/b/b.o", "")],
            output: "apps/b".to_string(),
            libs: vec!["m".to_string()],
            archives: vec!["libs/libm.a".to_string()],
            linkflags: String::new(),
            use_cxx_linker: false,
        });

        let text = render(&plan);
        assert!(text.contains(
            "build $PRJ_PATH/apps/b: rule_ld $PRJ_PATH/objs/b/b.o || $PRJ_PATH/libs/libm.a\n"
        ));
        assert!(text.contains("    FLAGS = -lm\n"));
        assert!(text.contains("build b: phony $PRJ_PATH/apps/b\n"));
    }

    #[test]
    fn test_target_edges_and_default() {
        let mut plan = empty_plan();
        plan.targets.push(CommandEdge {
            name: "all".to_string(),
            desc: String::new(),
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
        assert!(text.contains("build all: phony m b\n"));
        assert!(text.contains("build clean: rule_cmd\n"));
        assert!(text.contains("    CMD = rm -rf /prj/objs\n"));
        assert!(text.ends_with("default all\n"));
    }

    #[test]
    fn test_command_dollars_escaped() {
        let mut plan = empty_plan();
        plan.targets.push(CommandEdge {
            name: "t".to_string(),
            desc: String::new(),
            command: "echo $HOME".to_string(),
            deps: vec![],
        });
        assert!(render(&plan).contains("    CMD = echo $$HOME\n"));
    }
}
