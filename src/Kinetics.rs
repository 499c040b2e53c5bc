/// Error types of the kinetics layer: parsing, conservation solving, compilation and
/// rate evaluation
pub mod kinetics_errors;
/// eng
/// Rate laws and parameter-linked coefficients as RustedSciThe expressions: checked
/// parsing, checked evaluation (undefined arithmetic is a `NumericDomainError`, never
/// NaN) and binding of variables to concentration and parameter slots.
pub mod symbolic;
/// Affine forms over non-linear parameter sub-expressions, used for exact symbolic
/// elimination in the conservation resolver
pub mod linear_form;
/// Reaction templates `[1/Y_H]S_S + [?]S_O -> X_BH`: terms, sides and typed
/// coefficients (literal | parameter expression | unknown)
pub mod reaction_template;
/// eng
/// Solves the `[?]` coefficients of a template from the conserved quantities (COD, N, P,
/// charge, ...) of the participating components: one linear equation per quantity,
/// numeric left-hand side, symbolic right-hand side. Reports under- and overdetermined
/// systems and normalizes the row on the reference component.
pub mod conservation;
/// Named parameters with defaults, the merged parameter table and named profiles
pub mod parameters;
/// One compiled process row: stoichiometry per registry component and its rate law
/// (symbolic or hand-written)
pub mod process;
/// eng
/// The process matrix compiler: templates + already-built processes -> `ProcessCollection`
/// with the dense Gujer matrix (processes x components), the merged parameter table and
/// one rate law per process. `set_parameters` is the only post-compile mutation.
pub mod processes;
/// Stateless evaluation of process rates and component production rates
pub mod rate_evaluator;
