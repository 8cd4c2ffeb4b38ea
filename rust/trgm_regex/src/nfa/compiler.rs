//! Regex pattern → [`CompiledNfa`].
//!
//! Parsing is done by `regex_syntax`. Every character set the pattern uses
//! (literal characters and classes) is split into disjoint atoms, and atoms
//! with identical set membership share one color. A Thompson NFA is then
//! built over those colors, epsilon transitions are removed and states that
//! are unreachable or cannot reach the final state are dropped.
//!
//! The result accepts a superset of what the pattern matches:
//!
//! - `^` variants read the BOS pseudo-color, `$` variants the EOS one.
//! - Word-boundary assertions are treated as empty.
//! - Counted repetitions above `max_repeat` are widened to an open bound.

use ahash::AHashMap;
use regex_syntax::hir::{Class, Hir, HirKind, Look};
use regex_syntax::ParserBuilder;
use tracing::debug;

use super::automaton::{CompiledNfa, NfaBuilder};
use super::{NfaArc, NfaState};
use crate::config::FilterConfig;
use crate::error::{Result, TrgmError};

/// Compile `pattern` into a color NFA.
pub fn compile(pattern: &str, config: &FilterConfig) -> Result<CompiledNfa> {
    let hir = ParserBuilder::new()
        .case_insensitive(config.case_insensitive)
        .build()
        .parse(pattern)?;

    let mut sets = Vec::new();
    collect_char_sets(&hir, &mut sets)?;
    let colors = ColorMap::partition(&sets);

    let mut thompson = Thompson::new(&colors, config);
    let (start, end) = thompson.compile(&hir)?;
    let accept = thompson.add_state()?;
    thompson.epsilon(end, accept);

    let nfa = thompson.finish(start, accept);
    debug!(
        colors = colors.len(),
        thompson_states = thompson.num_states(),
        states = nfa.num_states(),
        arcs = nfa.num_arcs(),
        "compiled pattern to color NFA"
    );
    Ok(nfa)
}

fn class_ranges(class: &Class) -> Vec<(u32, u32)> {
    match class {
        Class::Unicode(cls) => cls
            .ranges()
            .iter()
            .map(|r| (r.start() as u32, r.end() as u32))
            .collect(),
        Class::Bytes(cls) => cls
            .ranges()
            .iter()
            .map(|r| (u32::from(r.start()), u32::from(r.end())))
            .collect(),
    }
}

fn literal_text(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| TrgmError::InvalidPattern(e.to_string()))
}

/// Gather every character set the pattern reads, one entry per literal
/// character or class.
fn collect_char_sets(hir: &Hir, sets: &mut Vec<Vec<(u32, u32)>>) -> Result<()> {
    match hir.kind() {
        HirKind::Empty | HirKind::Look(_) => {}
        HirKind::Literal(lit) => {
            for c in literal_text(&lit.0)?.chars() {
                sets.push(vec![(c as u32, c as u32)]);
            }
        }
        HirKind::Class(class) => sets.push(class_ranges(class)),
        HirKind::Repetition(rep) => collect_char_sets(&rep.sub, sets)?,
        HirKind::Capture(cap) => collect_char_sets(&cap.sub, sets)?,
        HirKind::Concat(subs) | HirKind::Alternation(subs) => {
            for sub in subs {
                collect_char_sets(sub, sets)?;
            }
        }
    }
    Ok(())
}

/// Disjoint partition of the code points used by a pattern.
///
/// Atom `i` covers `bounds[i]..bounds[i + 1]`; `atom_colors[i]` is `None`
/// for gaps that no set touches.
#[derive(Debug)]
struct ColorMap {
    bounds: Vec<u32>,
    atom_colors: Vec<Option<u32>>,
    ranges: Vec<Vec<(u32, u32)>>,
}

impl ColorMap {
    fn partition(sets: &[Vec<(u32, u32)>]) -> Self {
        let mut bounds: Vec<u32> = sets
            .iter()
            .flatten()
            .flat_map(|&(lo, hi)| [lo, hi + 1])
            .collect();
        bounds.sort_unstable();
        bounds.dedup();

        let atoms = bounds.len().saturating_sub(1);
        let mut signatures: Vec<Vec<usize>> = vec![Vec::new(); atoms];
        for (set_id, set) in sets.iter().enumerate() {
            for &(lo, hi) in set {
                let Ok(mut i) = bounds.binary_search(&lo) else {
                    continue;
                };
                while i < atoms && bounds[i] <= hi {
                    if signatures[i].last() != Some(&set_id) {
                        signatures[i].push(set_id);
                    }
                    i += 1;
                }
            }
        }

        let mut by_signature: AHashMap<Vec<usize>, u32> = AHashMap::new();
        let mut ranges: Vec<Vec<(u32, u32)>> = Vec::new();
        let mut atom_colors = Vec::with_capacity(atoms);
        for (i, signature) in signatures.into_iter().enumerate() {
            if signature.is_empty() {
                atom_colors.push(None);
                continue;
            }
            let next = ranges.len() as u32;
            let co = *by_signature.entry(signature).or_insert(next);
            if co == next {
                ranges.push(Vec::new());
            }
            ranges[co as usize].push((bounds[i], bounds[i + 1] - 1));
            atom_colors.push(Some(co));
        }

        ColorMap {
            bounds,
            atom_colors,
            ranges,
        }
    }

    fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Colors covering the code points `lo..=hi`, sorted and deduplicated.
    fn lookup(&self, lo: u32, hi: u32) -> Vec<u32> {
        let mut colors = Vec::new();
        let mut i = self.bounds.partition_point(|&b| b <= lo).saturating_sub(1);
        while i < self.atom_colors.len() && self.bounds[i] <= hi {
            if let Some(co) = self.atom_colors[i] {
                colors.push(co);
            }
            i += 1;
        }
        colors.sort_unstable();
        colors.dedup();
        colors
    }
}

/// Start and end state of a sub-automaton.
type Fragment = (NfaState, NfaState);

/// Thompson construction with explicit epsilon lists.
struct Thompson<'a> {
    colors: &'a ColorMap,
    bos: u32,
    eos: u32,
    arcs: Vec<Vec<NfaArc>>,
    eps: Vec<Vec<NfaState>>,
    max_states: usize,
    max_repeat: u32,
}

impl<'a> Thompson<'a> {
    fn new(colors: &'a ColorMap, config: &FilterConfig) -> Self {
        let n = colors.len() as u32;
        Thompson {
            colors,
            bos: n,
            eos: n + 1,
            arcs: Vec::new(),
            eps: Vec::new(),
            max_states: config.max_nfa_states,
            max_repeat: config.max_repeat,
        }
    }

    fn num_states(&self) -> usize {
        self.arcs.len()
    }

    fn add_state(&mut self) -> Result<NfaState> {
        if self.arcs.len() >= self.max_states {
            return Err(TrgmError::PatternTooLarge {
                states: self.arcs.len() + 1,
                limit: self.max_states,
            });
        }
        self.arcs.push(Vec::new());
        self.eps.push(Vec::new());
        Ok(self.arcs.len() - 1)
    }

    fn arc(&mut self, from: NfaState, co: u32, to: NfaState) {
        self.arcs[from].push(NfaArc { co, to });
    }

    fn epsilon(&mut self, from: NfaState, to: NfaState) {
        self.eps[from].push(to);
    }

    fn ranges_fragment(&mut self, ranges: &[(u32, u32)]) -> Result<Fragment> {
        let start = self.add_state()?;
        let end = self.add_state()?;
        let mut colors: Vec<u32> = ranges
            .iter()
            .flat_map(|&(lo, hi)| self.colors.lookup(lo, hi))
            .collect();
        colors.sort_unstable();
        colors.dedup();
        for co in colors {
            self.arc(start, co, end);
        }
        Ok((start, end))
    }

    fn compile(&mut self, hir: &Hir) -> Result<Fragment> {
        match hir.kind() {
            HirKind::Empty => {
                let s = self.add_state()?;
                Ok((s, s))
            }
            HirKind::Literal(lit) => {
                let start = self.add_state()?;
                let mut cur = start;
                for c in literal_text(&lit.0)?.chars() {
                    let (s, e) = self.ranges_fragment(&[(c as u32, c as u32)])?;
                    self.epsilon(cur, s);
                    cur = e;
                }
                Ok((start, cur))
            }
            HirKind::Class(class) => self.ranges_fragment(&class_ranges(class)),
            HirKind::Look(look) => {
                let s = self.add_state()?;
                let e = self.add_state()?;
                match look {
                    Look::Start | Look::StartLF | Look::StartCRLF => self.arc(s, self.bos, e),
                    Look::End | Look::EndLF | Look::EndCRLF => self.arc(s, self.eos, e),
                    _ => self.epsilon(s, e),
                }
                Ok((s, e))
            }
            HirKind::Repetition(rep) => {
                let min = rep.min.min(self.max_repeat);
                let max = rep.max.filter(|&m| m <= self.max_repeat);

                let start = self.add_state()?;
                let mut cur = start;
                for _ in 0..min {
                    let (s, e) = self.compile(&rep.sub)?;
                    self.epsilon(cur, s);
                    cur = e;
                }
                let end = self.add_state()?;
                match max {
                    None => {
                        let (s, e) = self.compile(&rep.sub)?;
                        self.epsilon(cur, s);
                        self.epsilon(e, s);
                        self.epsilon(e, end);
                    }
                    Some(max) => {
                        for _ in min..max {
                            let (s, e) = self.compile(&rep.sub)?;
                            self.epsilon(cur, end);
                            self.epsilon(cur, s);
                            cur = e;
                        }
                    }
                }
                self.epsilon(cur, end);
                Ok((start, end))
            }
            HirKind::Capture(cap) => self.compile(&cap.sub),
            HirKind::Concat(subs) => {
                let start = self.add_state()?;
                let mut cur = start;
                for sub in subs {
                    let (s, e) = self.compile(sub)?;
                    self.epsilon(cur, s);
                    cur = e;
                }
                Ok((start, cur))
            }
            HirKind::Alternation(subs) => {
                let start = self.add_state()?;
                let end = self.add_state()?;
                for sub in subs {
                    let (s, e) = self.compile(sub)?;
                    self.epsilon(start, s);
                    self.epsilon(e, end);
                }
                Ok((start, end))
            }
        }
    }

    /// Remove epsilons, drop useless states and renumber from 0.
    fn finish(&self, start: NfaState, accept: NfaState) -> CompiledNfa {
        let n = self.arcs.len();

        let mut builder = NfaBuilder::new();
        for ranges in &self.colors.ranges {
            builder.add_color_code_points(ranges.clone());
        }
        builder.add_bos();
        builder.add_eos();

        // States that reach `accept` through epsilons alone.
        let mut eps_rev: Vec<Vec<NfaState>> = vec![Vec::new(); n];
        for (u, outs) in self.eps.iter().enumerate() {
            for &v in outs {
                eps_rev[v].push(u);
            }
        }
        let mut accepting = vec![false; n];
        accepting[accept] = true;
        let mut stack = vec![accept];
        while let Some(v) = stack.pop() {
            for &u in &eps_rev[v] {
                if !accepting[u] {
                    accepting[u] = true;
                    stack.push(u);
                }
            }
        }

        // The empty string matches, so every text does.
        if accepting[start] {
            let s = builder.add_state();
            return builder.build(s, s);
        }

        // Forward pass in discovery order, arcs still on old state ids.
        let mut order = vec![start];
        let mut index = vec![usize::MAX; n];
        index[start] = 0;
        let mut closure_mark = vec![usize::MAX; n];
        let mut out: Vec<Vec<NfaArc>> = Vec::new();
        while out.len() < order.len() {
            let i = out.len();
            let u = order[i];
            let mut arcs = Vec::new();
            let mut stack = vec![u];
            closure_mark[u] = i;
            while let Some(v) = stack.pop() {
                for arc in &self.arcs[v] {
                    arcs.push(*arc);
                    if accepting[arc.to] && arc.to != accept {
                        arcs.push(NfaArc {
                            co: arc.co,
                            to: accept,
                        });
                    }
                }
                for &w in &self.eps[v] {
                    if closure_mark[w] != i {
                        closure_mark[w] = i;
                        stack.push(w);
                    }
                }
            }
            for arc in &arcs {
                if index[arc.to] == usize::MAX {
                    index[arc.to] = order.len();
                    order.push(arc.to);
                }
            }
            out.push(arcs);
        }
        if index[accept] == usize::MAX {
            index[accept] = order.len();
            order.push(accept);
            out.push(Vec::new());
        }

        // Keep the initial state and everything that can reach the final one.
        let mut rev: Vec<Vec<usize>> = vec![Vec::new(); order.len()];
        for (i, arcs) in out.iter().enumerate() {
            for arc in arcs {
                rev[index[arc.to]].push(i);
            }
        }
        let mut live = vec![false; order.len()];
        live[index[accept]] = true;
        let mut stack = vec![index[accept]];
        while let Some(v) = stack.pop() {
            for &u in &rev[v] {
                if !live[u] {
                    live[u] = true;
                    stack.push(u);
                }
            }
        }
        live[0] = true;

        let mut renumber = vec![usize::MAX; order.len()];
        for i in (0..order.len()).filter(|&i| live[i]) {
            renumber[i] = builder.add_state();
        }
        for (i, arcs) in out.iter().enumerate() {
            if !live[i] {
                continue;
            }
            for arc in arcs {
                let to = index[arc.to];
                if live[to] {
                    builder.add_arc(renumber[i], arc.co, renumber[to]);
                }
            }
        }
        builder.build(renumber[0], renumber[index[accept]])
    }
}
